use crate::error::{HistonetError, Result};
use crate::io::{StateDict, TensorData};
use crate::nn::Module;
use crate::tensor::Tensor;

/// Fully-connected (dense/linear) layer
///
/// Computes y = xW + b where x is (batch, in_features), W is
/// (in_features, out_features) and b is (out_features).
pub struct Linear {
    weight: Tensor,
    bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new linear layer with Xavier-uniform initialization.
    pub fn new(in_features: usize, out_features: usize, use_bias: bool) -> Result<Self> {
        let weight = Tensor::xavier_uniform(in_features, out_features)?;
        let bias = use_bias.then(|| Tensor::zeros(&[out_features]));
        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Module for Linear {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        // The width check here is what catches a body output that does not
        // match the classifier head (e.g. an input image that did not reduce
        // to the expected feature-map size).
        let batch = x.shape().first().copied().unwrap_or(0);
        if x.rank() != 2 || x.shape()[1] != self.in_features {
            return Err(HistonetError::ShapeMismatch {
                expected: vec![batch, self.in_features],
                actual: x.shape().to_vec(),
            });
        }

        let out = x.matmul(&self.weight)?;
        match self.bias {
            Some(ref bias) => {
                let mut data = out.data().to_vec();
                let b = bias.data();
                for row in data.chunks_mut(self.out_features) {
                    for (v, &bv) in row.iter_mut().zip(b) {
                        *v += bv;
                    }
                }
                Tensor::new(data, out.shape())
            }
            None => Ok(out),
        }
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
