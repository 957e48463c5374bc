use crate::error::{HistonetError, Result};
use crate::io::StateDict;
use crate::nn::Module;
use crate::tensor::Tensor;

/// 2D max pooling layer
///
/// Accepts tensors shaped (batch, channels, height, width) and downsamples
/// each spatial window to its maximum value.
pub struct MaxPool2d {
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
}

impl MaxPool2d {
    /// Square-kernel constructor for convenience
    #[must_use]
    pub const fn new(kernel: usize, stride: usize, padding: usize) -> Self {
        Self {
            kernel: (kernel, kernel),
            stride: (stride, stride),
            padding: (padding, padding),
        }
    }

    /// Arbitrary kernel/stride/padding constructor
    #[must_use]
    pub const fn with_params(
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Self {
        Self {
            kernel,
            stride,
            padding,
        }
    }

    fn pool_forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, channels, _, _) = x.dims4()?;

        let (pad_h, pad_w) = self.padding;
        let x_padded = x.pad2d(pad_h, pad_w)?;
        let (_, _, padded_h, padded_w) = x_padded.dims4()?;

        let (kernel_h, kernel_w) = self.kernel;
        let (stride_h, stride_w) = self.stride;
        if kernel_h == 0 || kernel_w == 0 || stride_h == 0 || stride_w == 0 {
            return Err(HistonetError::InvalidParameter(
                "MaxPool2d kernel and stride must be positive".to_string(),
            ));
        }
        if padded_h < kernel_h || padded_w < kernel_w {
            return Err(HistonetError::InvalidParameter(format!(
                "kernel {kernel_h}x{kernel_w} larger than padded input {padded_h}x{padded_w}"
            )));
        }

        let h_out = (padded_h - kernel_h) / stride_h + 1;
        let w_out = (padded_w - kernel_w) / stride_w + 1;

        let data = x_padded.data();
        let mut out = vec![0.0f32; batch * channels * h_out * w_out];

        for b in 0..batch {
            for c in 0..channels {
                for oh in 0..h_out {
                    for ow in 0..w_out {
                        let h_start = oh * stride_h;
                        let w_start = ow * stride_w;

                        let mut max_val = f32::NEG_INFINITY;
                        for kh in 0..kernel_h {
                            let row = (((b * channels + c) * padded_h) + h_start + kh) * padded_w
                                + w_start;
                            for kw in 0..kernel_w {
                                let val = data[row + kw];
                                if val > max_val {
                                    max_val = val;
                                }
                            }
                        }

                        let out_idx = (((b * channels) + c) * h_out + oh) * w_out + ow;
                        out[out_idx] = max_val;
                    }
                }
            }
        }

        Tensor::new(out, &[batch, channels, h_out, w_out])
    }
}

impl Module for MaxPool2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.pool_forward(x)
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
    fn test_maxpool2d_forward_shape() {
        let pool = MaxPool2d::new(2, 2, 0);
        let x = Tensor::randn(&[1, 3, 32, 32]);
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 3, 16, 16]);
    }

    #[test]
    fn test_maxpool2d_forward_values() {
        let pool = MaxPool2d::new(2, 2, 0);
        let data = vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ];
        let x = Tensor::new(data, &[1, 1, 4, 4]).unwrap();
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.data(), &[6.0, 8.0, 14.0, 16.0]);
    }

    #[test]
    fn test_maxpool2d_halves_odd_extent_by_floor() {
        let pool = MaxPool2d::new(2, 2, 0);
        let x = Tensor::randn(&[1, 1, 7, 7]);
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 3, 3]);
    }

    #[test]
    fn test_maxpool2d_forward_shape_with_padding() {
        let pool = MaxPool2d::new(2, 2, 1);
        let x = Tensor::randn(&[1, 1, 3, 3]);
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 2, 2]);
    }

    #[test]
    fn test_maxpool2d_shape_formula() {
        // h_out = (h + 2*pad - kernel) / stride + 1
        let pool = MaxPool2d::new(3, 2, 1);
        let x = Tensor::randn(&[2, 4, 10, 10]);
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 4, 5, 5]);
    }

    #[test]
    fn test_maxpool2d_asymmetric_params() {
        let pool = MaxPool2d::with_params((2, 3), (2, 2), (1, 1));
        let x = Tensor::randn(&[1, 1, 8, 8]);
        let y = pool.forward(&x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 5, 4]);
    }

    #[test]
    fn test_maxpool2d_kernel_larger_than_input() {
        let pool = MaxPool2d::new(5, 1, 0);
        let x = Tensor::randn(&[1, 1, 3, 3]);
        assert!(pool.forward(&x).is_err());
    }

    #[test]
    fn test_maxpool2d_rejects_non_4d() {
        let pool = MaxPool2d::new(2, 2, 0);
        let x = Tensor::randn(&[3, 8, 8]);
        assert!(pool.forward(&x).is_err());
    }
}
