use crate::error::Result;
use crate::io::StateDict;
use crate::nn::Module;
use crate::tensor::Tensor;

pub struct ReLU;

impl Module for ReLU {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(x.relu())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![] // No learnable params
    }

    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        // Stateless
        Ok(())
    }
}
