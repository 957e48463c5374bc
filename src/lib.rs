//! CPU inference stack for VGG-style histology classifiers.
//!
//! Architecture layouts are compiled from declarative stage lists
//! ([`models::LayerSpec`]) into conv/pool graphs, executed by a small
//! forward-only tensor backend. Benign/malignant is the default head, but
//! channel and class counts are configurable.

pub mod data;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod nn;
pub mod tensor;
pub mod utils;

pub use data::{channel_stats, DataLoader};
pub use error::{HistonetError, Result};
pub use io::{
    diff_state_dict, load_state_dict, load_state_dict_checked, save_state_dict, StateDict,
    StateDictDiff, TensorData,
};
pub use models::{
    body_output_shape, build_model, build_model_with, compile_body, BodyStage, LayerSpec, Vgg,
    VggVariant,
};
pub use nn::layers::{
    BatchNorm2d, Conv2d, Dropout, Flatten, Linear, MaxPool2d, ReLU, Sequential, SequentialBuilder,
};
pub use nn::Module;
pub use tensor::Tensor;
pub use utils::ProgressBar;
