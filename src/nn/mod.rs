use crate::error::Result;
use crate::io::StateDict;
use crate::tensor::Tensor;

pub mod layers;

pub use layers::{
    BatchNorm2d, Conv2d, Dropout, Flatten, Linear, MaxPool2d, ReLU, Sequential, SequentialBuilder,
};

pub trait Module {
    /// Run the forward pass. Shape violations propagate as errors.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// Learnable parameters, in declaration order.
    fn parameters(&self) -> Vec<&Tensor>;

    // State dict methods
    fn state_dict(&self) -> StateDict;
    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;

    /// Switch between training and evaluation modes.
    /// Important for layers like `BatchNorm2d` and `Dropout`.
    fn train(&mut self, _mode: bool) {}
    fn eval(&mut self) {
        self.train(false);
    }

    /// Total number of learnable scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|t| t.len()).sum()
    }
}
