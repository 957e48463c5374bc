use crate::error::{HistonetError, Result};
use crate::io::{StateDict, TensorData};
use crate::nn::Module;
use crate::tensor::Tensor;

/// 2D convolution layer over NCHW tensors.
///
/// Weight layout is [out_channels, in_channels, kernel_h, kernel_w]; spatial
/// output size follows (h + 2*pad - kernel) / stride + 1.
pub struct Conv2d {
    weight: Tensor,
    bias: Option<Tensor>,
    in_channels: usize,
    out_channels: usize,
    kernel: (usize, usize),
    stride: (usize, usize),
    padding: (usize, usize),
}

impl Conv2d {
    /// Square-kernel constructor. Weights use He-normal init.
    pub fn new(
        in_ch: usize,
        out_ch: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        use_bias: bool,
    ) -> Result<Self> {
        if kernel == 0 || stride == 0 {
            return Err(HistonetError::InvalidParameter(
                "Conv2d kernel and stride must be positive".to_string(),
            ));
        }
        let fan_in = in_ch * kernel * kernel;
        let weight = Tensor::he_normal(&[out_ch, in_ch, kernel, kernel], fan_in)?;
        let bias = use_bias.then(|| Tensor::zeros(&[out_ch]));
        Ok(Conv2d {
            weight,
            bias,
            in_channels: in_ch,
            out_channels: out_ch,
            kernel: (kernel, kernel),
            stride: (stride, stride),
            padding: (padding, padding),
        })
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    fn conv_forward(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, channels, _, _) = x.dims4()?;
        if channels != self.in_channels {
            return Err(HistonetError::ShapeMismatch {
                expected: vec![batch, self.in_channels],
                actual: x.shape().to_vec(),
            });
        }

        let (pad_h, pad_w) = self.padding;
        let x_padded = x.pad2d(pad_h, pad_w)?;
        let (_, _, padded_h, padded_w) = x_padded.dims4()?;

        let (kernel_h, kernel_w) = self.kernel;
        let (stride_h, stride_w) = self.stride;
        if padded_h < kernel_h || padded_w < kernel_w {
            return Err(HistonetError::InvalidParameter(format!(
                "kernel {kernel_h}x{kernel_w} larger than padded input {padded_h}x{padded_w}"
            )));
        }

        let h_out = (padded_h - kernel_h) / stride_h + 1;
        let w_out = (padded_w - kernel_w) / stride_w + 1;

        let data = x_padded.data();
        let w_data = self.weight.data();
        let mut out = vec![0.0f32; batch * self.out_channels * h_out * w_out];

        for b in 0..batch {
            for o in 0..self.out_channels {
                let base = if let Some(ref bias) = self.bias {
                    bias.data()[o]
                } else {
                    0.0
                };
                for oh in 0..h_out {
                    for ow in 0..w_out {
                        let h_start = oh * stride_h;
                        let w_start = ow * stride_w;
                        let mut acc = base;
                        for c in 0..channels {
                            let w_base = ((o * channels + c) * kernel_h) * kernel_w;
                            let in_base = (b * channels + c) * padded_h;
                            for kh in 0..kernel_h {
                                let in_row = (in_base + h_start + kh) * padded_w + w_start;
                                let w_row = w_base + kh * kernel_w;
                                for kw in 0..kernel_w {
                                    acc += data[in_row + kw] * w_data[w_row + kw];
                                }
                            }
                        }
                        let out_idx = ((b * self.out_channels + o) * h_out + oh) * w_out + ow;
                        out[out_idx] = acc;
                    }
                }
            }
        }

        Tensor::new(out, &[batch, self.out_channels, h_out, w_out])
    }
}

impl Module for Conv2d {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.conv_forward(x)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weight];
        if let Some(ref bias) = self.bias {
            params.push(bias);
        }
        params
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        state.insert("weight".to_string(), TensorData::from_tensor(&self.weight));
        if let Some(ref bias) = self.bias {
            state.insert("bias".to_string(), TensorData::from_tensor(bias));
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        if let Some(td) = state.get("weight") {
            self.weight = td.to_tensor()?;
        }
        if let Some(td) = state.get("bias") {
            if let Some(ref mut bias) = self.bias {
                *bias = td.to_tensor()?;
            }
        }
        Ok(())
    }
}
