use crate::error::Result;
use crate::io::StateDict;
use crate::nn::Module;
use crate::tensor::Tensor;

/// Flattens the input into a 2D tensor (batch_size, remaining_features).
///
/// The first dimension is treated as the batch dimension; all subsequent
/// dimensions collapse into one.
pub struct Flatten;

impl Module for Flatten {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let shape = x.shape();
        if shape.len() < 2 {
            // Already flat or scalar
            return Ok(x.clone());
        }

        let batch_size = shape[0];
        let flattened: usize = shape[1..].iter().product();
        x.reshape(&[batch_size, flattened])
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten() {
        // B=2, C=2, H=2, W=2 -> 2 x 8
        let x = Tensor::zeros(&[2, 2, 2, 2]);
        let y = Flatten.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 8]);
    }

    #[test]
    fn test_flatten_passthrough_for_flat_input() {
        let x = Tensor::zeros(&[5]);
        let y = Flatten.forward(&x).unwrap();
        assert_eq!(y.shape(), &[5]);
    }
}
