pub mod vgg;
pub mod zoo;

pub use vgg::{
    body_output_shape, compile_body, BodyStage, LayerSpec, Vgg, VggVariant, FEATURE_CHANNELS,
    FEATURE_MAP_SIZE, VGG11_LAYOUT, VGG13_LAYOUT, VGG16_LAYOUT, VGG19_LAYOUT,
};
pub use zoo::{build_model, build_model_with, AVAILABLE_MODELS};
