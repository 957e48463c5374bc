use crate::error::Result;
use crate::models::vgg::{Vgg, VggVariant};

/// Names accepted by [`build_model`], case-insensitively.
pub const AVAILABLE_MODELS: [&str; 4] = ["vgg11", "vgg13", "vgg16", "vgg19"];

/// Default configuration for RGB histology slides classified as
/// benign vs. malignant.
const DEFAULT_IN_CHANNELS: usize = 3;
const DEFAULT_NUM_CLASSES: usize = 2;

/// Construct a model by name with the default 3-channel input and binary
/// output head. Unknown names fail before any parameters are allocated.
pub fn build_model(name: &str) -> Result<Vgg> {
    build_model_with(name, DEFAULT_IN_CHANNELS, DEFAULT_NUM_CLASSES)
}

/// Construct a model by name with explicit input-channel and class counts.
pub fn build_model_with(name: &str, in_channels: usize, num_classes: usize) -> Result<Vgg> {
    let variant: VggVariant = name.parse()?;
    Vgg::new(variant, in_channels, num_classes)
}
