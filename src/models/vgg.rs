use std::str::FromStr;

use crate::error::{HistonetError, Result};
use crate::io::StateDict;
use crate::nn::layers::{BatchNorm2d, Conv2d, Dropout, Flatten, Linear, MaxPool2d, ReLU, Sequential};
use crate::nn::Module;
use crate::tensor::Tensor;

/// One stage descriptor in a VGG body layout: a 3x3 conv block with the given
/// output width, or a 2x2/stride-2 max-pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSpec {
    Conv(usize),
    Pool,
}

use LayerSpec::{Conv, Pool};

// Layer tables from the original VGG paper (batch-norm configurations).
pub const VGG11_LAYOUT: &[LayerSpec] = &[
    Conv(64),
    Pool,
    Conv(128),
    Pool,
    Conv(256),
    Conv(256),
    Pool,
    Conv(512),
    Conv(512),
    Pool,
    Conv(512),
    Conv(512),
    Pool,
];

pub const VGG13_LAYOUT: &[LayerSpec] = &[
    Conv(64),
    Conv(64),
    Pool,
    Conv(128),
    Conv(128),
    Pool,
    Conv(256),
    Conv(256),
    Pool,
    Conv(512),
    Conv(512),
    Pool,
    Conv(512),
    Conv(512),
    Pool,
];

pub const VGG16_LAYOUT: &[LayerSpec] = &[
    Conv(64),
    Conv(64),
    Pool,
    Conv(128),
    Conv(128),
    Pool,
    Conv(256),
    Conv(256),
    Conv(256),
    Pool,
    Conv(512),
    Conv(512),
    Conv(512),
    Pool,
    Conv(512),
    Conv(512),
    Conv(512),
    Pool,
];

pub const VGG19_LAYOUT: &[LayerSpec] = &[
    Conv(64),
    Conv(64),
    Pool,
    Conv(128),
    Conv(128),
    Pool,
    Conv(256),
    Conv(256),
    Conv(256),
    Conv(256),
    Pool,
    Conv(512),
    Conv(512),
    Conv(512),
    Conv(512),
    Pool,
    Conv(512),
    Conv(512),
    Conv(512),
    Conv(512),
    Pool,
];

/// The four supported VGG depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VggVariant {
    Vgg11,
    Vgg13,
    Vgg16,
    Vgg19,
}

impl VggVariant {
    pub const ALL: [VggVariant; 4] = [
        VggVariant::Vgg11,
        VggVariant::Vgg13,
        VggVariant::Vgg16,
        VggVariant::Vgg19,
    ];

    pub fn layout(self) -> &'static [LayerSpec] {
        match self {
            VggVariant::Vgg11 => VGG11_LAYOUT,
            VggVariant::Vgg13 => VGG13_LAYOUT,
            VggVariant::Vgg16 => VGG16_LAYOUT,
            VggVariant::Vgg19 => VGG19_LAYOUT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VggVariant::Vgg11 => "vgg11",
            VggVariant::Vgg13 => "vgg13",
            VggVariant::Vgg16 => "vgg16",
            VggVariant::Vgg19 => "vgg19",
        }
    }
}

impl FromStr for VggVariant {
    type Err = HistonetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vgg11" => Ok(VggVariant::Vgg11),
            "vgg13" => Ok(VggVariant::Vgg13),
            "vgg16" => Ok(VggVariant::Vgg16),
            "vgg19" => Ok(VggVariant::Vgg19),
            _ => Err(HistonetError::UnknownModel(s.to_string())),
        }
    }
}

impl std::fmt::Display for VggVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled body stage with channel counts already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStage {
    Conv {
        in_channels: usize,
        out_channels: usize,
    },
    Pool,
}

/// Expand a layout into executable stage descriptors, threading the running
/// channel count left to right.
///
/// A zero conv width is a configuration error, not a silent skip.
pub fn compile_body(layout: &[LayerSpec], in_channels: usize) -> Result<Vec<BodyStage>> {
    if in_channels == 0 {
        return Err(HistonetError::InvalidParameter(
            "input channel count must be positive".to_string(),
        ));
    }

    let mut stages = Vec::with_capacity(layout.len());
    let mut channels = in_channels;
    for spec in layout {
        match *spec {
            LayerSpec::Conv(width) => {
                if width == 0 {
                    return Err(HistonetError::InvalidParameter(
                        "conv stage width must be positive".to_string(),
                    ));
                }
                stages.push(BodyStage::Conv {
                    in_channels: channels,
                    out_channels: width,
                });
                channels = width;
            }
            LayerSpec::Pool => stages.push(BodyStage::Pool),
        }
    }
    Ok(stages)
}

/// Propagate a (channels, height, width) shape through compiled stages:
/// convs preserve the spatial extent and set the channel count, pools
/// floor-halve height and width.
pub fn body_output_shape(
    stages: &[BodyStage],
    input: (usize, usize, usize),
) -> (usize, usize, usize) {
    let (mut c, mut h, mut w) = input;
    for stage in stages {
        match *stage {
            BodyStage::Conv { out_channels, .. } => c = out_channels,
            BodyStage::Pool => {
                h /= 2;
                w /= 2;
            }
        }
    }
    (c, h, w)
}

/// Spatial extent of the feature map entering the classifier head.
pub const FEATURE_MAP_SIZE: usize = 7;
/// Channel width at the end of every variant's body.
pub const FEATURE_CHANNELS: usize = 512;

const CLASSIFIER_INPUT: usize = FEATURE_CHANNELS * FEATURE_MAP_SIZE * FEATURE_MAP_SIZE;
const CLASSIFIER_HIDDEN: usize = 4096;
const CLASSIFIER_DROPOUT: f32 = 0.5;

/// VGG classifier: a conv/pool body compiled from a variant layout followed
/// by a three-stage fully-connected head.
///
/// The head's first linear stage hard-codes a 512x7x7 input, so images must
/// reach the body at a spatial size that five halvings reduce to 7x7
/// (224x224 in all provided configurations).
pub struct Vgg {
    variant: VggVariant,
    stages: Vec<BodyStage>,
    features: Sequential,
    classifier: Sequential,
}

impl std::fmt::Debug for Vgg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vgg")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl Vgg {
    pub fn new(variant: VggVariant, in_channels: usize, num_classes: usize) -> Result<Self> {
        if num_classes == 0 {
            return Err(HistonetError::InvalidParameter(
                "num_classes must be positive".to_string(),
            ));
        }

        let stages = compile_body(variant.layout(), in_channels)?;

        let mut features = Sequential::new(vec![]);
        for stage in &stages {
            match *stage {
                BodyStage::Conv {
                    in_channels,
                    out_channels,
                } => {
                    features.push(Box::new(Conv2d::new(in_channels, out_channels, 3, 1, 1, true)?));
                    features.push(Box::new(BatchNorm2d::new(out_channels)));
                    features.push(Box::new(ReLU));
                }
                BodyStage::Pool => features.push(Box::new(MaxPool2d::new(2, 2, 0))),
            }
        }

        let classifier = Sequential::builder()
            .add_unnamed(Box::new(Flatten))
            .add_named(
                "fc1",
                Box::new(Linear::new(CLASSIFIER_INPUT, CLASSIFIER_HIDDEN, true)?),
            )
            .add_unnamed(Box::new(ReLU))
            .add_unnamed(Box::new(Dropout::new(CLASSIFIER_DROPOUT)?))
            .add_named(
                "fc2",
                Box::new(Linear::new(CLASSIFIER_HIDDEN, CLASSIFIER_HIDDEN, true)?),
            )
            .add_unnamed(Box::new(ReLU))
            .add_unnamed(Box::new(Dropout::new(CLASSIFIER_DROPOUT)?))
            .add_named(
                "fc3",
                Box::new(Linear::new(CLASSIFIER_HIDDEN, num_classes, true)?),
            )
            .build();

        Ok(Vgg {
            variant,
            stages,
            features,
            classifier,
        })
    }

    pub fn variant(&self) -> VggVariant {
        self.variant
    }

    /// The compiled stage descriptors the body was built from.
    pub fn stages(&self) -> &[BodyStage] {
        &self.stages
    }

    /// Run only the conv/pool body, returning the unflattened feature map.
    pub fn forward_features(&self, x: &Tensor) -> Result<Tensor> {
        self.features.forward(x)
    }
}

impl Module for Vgg {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let features = self.features.forward(x)?;
        self.classifier.forward(&features)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.features.parameters();
        params.extend(self.classifier.parameters());
        params
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (key, value) in self.features.state_dict() {
            state.insert(format!("features.{key}"), value);
        }
        for (key, value) in self.classifier.state_dict() {
            state.insert(format!("classifier.{key}"), value);
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        let mut features_state = StateDict::new();
        let mut classifier_state = StateDict::new();
        for (key, value) in state {
            if let Some(sub) = key.strip_prefix("features.") {
                features_state.insert(sub.to_string(), value.clone());
            } else if let Some(sub) = key.strip_prefix("classifier.") {
                classifier_state.insert(sub.to_string(), value.clone());
            }
        }
        self.features.load_state_dict(&features_state)?;
        self.classifier.load_state_dict(&classifier_state)?;
        Ok(())
    }

    fn train(&mut self, mode: bool) {
        self.features.train(mode);
        self.classifier.train(mode);
    }
}
