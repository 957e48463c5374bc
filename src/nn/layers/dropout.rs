use crate::error::{HistonetError, Result};
use crate::io::StateDict;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::Rng;

/// Stochastic zeroing with inverted scaling.
///
/// In training mode each element is zeroed with probability `p` and the
/// survivors are scaled by 1/(1-p); outside training mode the layer is a
/// passthrough.
pub struct Dropout {
    p: f32,
    training: bool,
}

impl Dropout {
    /// `p` is the probability of an element being zeroed out.
    pub fn new(p: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(HistonetError::InvalidParameter(format!(
                "dropout probability must be in [0, 1], got {p}"
            )));
        }
        Ok(Self { p, training: true })
    }
}

impl Module for Dropout {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if !self.training || self.p == 0.0 {
            return Ok(x.clone());
        }

        let keep_prob = 1.0 - self.p;
        let scale = if keep_prob > 0.0 { 1.0 / keep_prob } else { 0.0 };

        let mut rng = rand::rng();
        let data: Vec<f32> = x
            .data()
            .iter()
            .map(|&v| {
                if rng.random::<f32>() < keep_prob {
                    v * scale
                } else {
                    0.0
                }
            })
            .collect();

        Tensor::new(data, x.shape())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        // Stateless
        Ok(())
    }

    fn train(&mut self, mode: bool) {
        self.training = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropout_eval_is_passthrough() {
        let mut drop = Dropout::new(0.5).unwrap();
        drop.eval();
        let x = Tensor::randn(&[2, 8]);
        let y = drop.forward(&x).unwrap();
        assert_eq!(x.data(), y.data());
    }

    #[test]
    fn test_dropout_zero_rate_is_passthrough() {
        let drop = Dropout::new(0.0).unwrap();
        let x = Tensor::randn(&[4, 4]);
        let y = drop.forward(&x).unwrap();
        assert_eq!(x.data(), y.data());
    }

    #[test]
    fn test_dropout_full_rate_zeroes_everything() {
        let drop = Dropout::new(1.0).unwrap();
        let x = Tensor::ones(&[16]);
        let y = drop.forward(&x).unwrap();
        assert!(y.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dropout_training_preserves_shape() {
        let drop = Dropout::new(0.5).unwrap();
        let x = Tensor::randn(&[3, 5, 2]);
        let y = drop.forward(&x).unwrap();
        assert_eq!(y.shape(), x.shape());
    }

    #[test]
    fn test_dropout_survivors_are_scaled() {
        let drop = Dropout::new(0.5).unwrap();
        let x = Tensor::ones(&[1000]);
        let y = drop.forward(&x).unwrap();
        for &v in y.data() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-6);
        }
        // With p=0.5 over 1000 elements, both outcomes occur
        assert!(y.data().iter().any(|&v| v == 0.0));
        assert!(y.data().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_dropout_rejects_out_of_range_rate() {
        assert!(Dropout::new(1.5).is_err());
        assert!(Dropout::new(-0.1).is_err());
    }
}
