use std::cell::RefCell;

use crate::error::{HistonetError, Result};
use crate::io::{StateDict, TensorData};
use crate::nn::Module;
use crate::tensor::Tensor;

/// Per-channel batch normalization for NCHW tensors.
///
/// Training mode normalizes with batch statistics and updates the running
/// mean/var; evaluation mode normalizes with the running statistics. Running
/// stats live behind `RefCell` so the forward pass can update them through
/// `&self`; the backend is single-threaded.
pub struct BatchNorm2d {
    num_features: usize,
    eps: f32,
    momentum: f32,
    training: bool,
    // Parameters (learnable)
    gamma: Tensor,
    beta: Tensor,
    // Buffers (non-learnable)
    running_mean: RefCell<Vec<f32>>,
    running_var: RefCell<Vec<f32>>,
}

impl BatchNorm2d {
    pub fn new(num_features: usize) -> Self {
        Self::new_with_params(num_features, 1e-5, 0.1)
    }

    pub fn new_with_params(num_features: usize, eps: f32, momentum: f32) -> Self {
        BatchNorm2d {
            num_features,
            eps,
            momentum,
            training: true,
            gamma: Tensor::ones(&[num_features]),
            beta: Tensor::zeros(&[num_features]),
            running_mean: RefCell::new(vec![0.0; num_features]),
            running_var: RefCell::new(vec![1.0; num_features]),
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }
}

impl Module for BatchNorm2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, channels, h, w) = x.dims4()?;
        if channels != self.num_features {
            return Err(HistonetError::ShapeMismatch {
                expected: vec![batch, self.num_features, h, w],
                actual: x.shape().to_vec(),
            });
        }

        let data = x.data();
        let plane = h * w;
        let num_pixels = (batch * plane) as f32;

        // Per-channel mean/var over (B, H, W)
        let (mean, var) = if self.training {
            let mut mean = vec![0.0f32; channels];
            let mut var = vec![0.0f32; channels];
            for c in 0..channels {
                let mut sum = 0.0;
                for b in 0..batch {
                    let start = (b * channels + c) * plane;
                    for &v in &data[start..start + plane] {
                        sum += v;
                    }
                }
                mean[c] = sum / num_pixels;

                let mut sq = 0.0;
                for b in 0..batch {
                    let start = (b * channels + c) * plane;
                    for &v in &data[start..start + plane] {
                        let d = v - mean[c];
                        sq += d * d;
                    }
                }
                // Biased variance for normalization, PyTorch-parity
                var[c] = sq / num_pixels;
            }

            // Update running stats; Bessel correction on the var update
            {
                let mut rm = self.running_mean.borrow_mut();
                let mut rv = self.running_var.borrow_mut();
                let m = self.momentum;
                let bessel = if num_pixels > 1.0 {
                    num_pixels / (num_pixels - 1.0)
                } else {
                    1.0
                };
                for c in 0..channels {
                    rm[c] = (1.0 - m) * rm[c] + m * mean[c];
                    rv[c] = (1.0 - m) * rv[c] + m * var[c] * bessel;
                }
            }

            (mean, var)
        } else {
            (
                self.running_mean.borrow().clone(),
                self.running_var.borrow().clone(),
            )
        };

        // Normalize, scale and shift: gamma * (x - mean) / sqrt(var + eps) + beta
        let gamma = self.gamma.data();
        let beta = self.beta.data();
        let mut out = vec![0.0f32; data.len()];
        for c in 0..channels {
            let denom = (var[c] + self.eps).sqrt();
            let scale = gamma[c] / denom;
            let shift = beta[c] - mean[c] * scale;
            for b in 0..batch {
                let start = (b * channels + c) * plane;
                for i in start..start + plane {
                    out[i] = data[i] * scale + shift;
                }
            }
        }

        Tensor::new(out, x.shape())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.gamma, &self.beta]
    }

    fn train(&mut self, mode: bool) {
        self.training = mode;
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        state.insert("gamma".to_string(), TensorData::from_tensor(&self.gamma));
        state.insert("beta".to_string(), TensorData::from_tensor(&self.beta));
        state.insert(
            "running_mean".to_string(),
            TensorData {
                data: self.running_mean.borrow().clone(),
                shape: vec![self.num_features],
            },
        );
        state.insert(
            "running_var".to_string(),
            TensorData {
                data: self.running_var.borrow().clone(),
                shape: vec![self.num_features],
            },
        );
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        if let Some(td) = state.get("gamma") {
            self.gamma = td.to_tensor()?;
        }
        if let Some(td) = state.get("beta") {
            self.beta = td.to_tensor()?;
        }
        if let Some(td) = state.get("running_mean") {
            *self.running_mean.borrow_mut() = td.data.clone();
        }
        if let Some(td) = state.get("running_var") {
            *self.running_var.borrow_mut() = td.data.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batchnorm_eval_is_near_identity_with_default_stats() {
        // Fresh running stats are mean=0, var=1, gamma=1, beta=0, so eval
        // mode divides by sqrt(1 + eps) only.
        let mut bn = BatchNorm2d::new(2);
        bn.eval();
        let x = Tensor::new(vec![1.0, -2.0, 3.0, 0.5], &[1, 2, 1, 2]).unwrap();
        let y = bn.forward(&x).unwrap();
        for (a, b) in x.data().iter().zip(y.data()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_batchnorm_train_normalizes_channel() {
        let bn = BatchNorm2d::new(1);
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]).unwrap();
        let y = bn.forward(&x).unwrap();
        let mean: f32 = y.data().iter().sum::<f32>() / 4.0;
        let var: f32 = y.data().iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
        assert!((var - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_batchnorm_updates_running_stats() {
        let bn = BatchNorm2d::new(1);
        let x = Tensor::new(vec![10.0, 10.0, 10.0, 10.0], &[1, 1, 2, 2]).unwrap();
        bn.forward(&x).unwrap();
        // running_mean moved from 0 towards 10 by momentum 0.1
        let rm = bn.running_mean.borrow();
        assert!((rm[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_batchnorm_channel_mismatch() {
        let bn = BatchNorm2d::new(3);
        let x = Tensor::randn(&[1, 2, 4, 4]);
        assert!(bn.forward(&x).is_err());
    }

    #[test]
    fn test_batchnorm_state_dict_roundtrip() {
        let bn = BatchNorm2d::new(2);
        let x = Tensor::randn(&[2, 2, 3, 3]);
        bn.forward(&x).unwrap();

        let state = bn.state_dict();
        let mut bn2 = BatchNorm2d::new(2);
        bn2.load_state_dict(&state).unwrap();
        assert_eq!(
            *bn.running_mean.borrow(),
            *bn2.running_mean.borrow()
        );
        assert_eq!(*bn.running_var.borrow(), *bn2.running_var.borrow());
    }
}
