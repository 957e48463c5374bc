use crate::error::Result;
use crate::io::StateDict;
use crate::nn::Module;
use crate::tensor::Tensor;

use super::sequential_builder::SequentialBuilder;

pub struct LayerEntry {
    pub name: Option<String>,
    pub layer: Box<dyn Module>,
}

/// Ordered container that runs its layers in sequence.
///
/// Layers may be named; state-dict keys are prefixed with the layer name, or
/// with the layer's index when unnamed.
pub struct Sequential {
    pub(crate) layers: Vec<LayerEntry>,
}

impl Sequential {
    pub fn new(layers: Vec<Box<dyn Module>>) -> Self {
        Sequential {
            layers: layers
                .into_iter()
                .map(|layer| LayerEntry { name: None, layer })
                .collect(),
        }
    }

    pub fn builder() -> SequentialBuilder {
        SequentialBuilder::new()
    }

    pub fn push(&mut self, layer: Box<dyn Module>) {
        self.layers.push(LayerEntry { name: None, layer });
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_names(&self) -> Vec<Option<&str>> {
        self.layers
            .iter()
            .map(|entry| entry.name.as_deref())
            .collect()
    }

    fn key_prefix(entry: &LayerEntry, index: usize) -> String {
        match entry.name {
            Some(ref name) => name.clone(),
            None => index.to_string(),
        }
    }
}

impl Module for Sequential {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut current = x.clone();
        for entry in &self.layers {
            current = entry.layer.forward(&current)?;
        }
        Ok(current)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.layers
            .iter()
            .flat_map(|entry| entry.layer.parameters())
            .collect()
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (i, entry) in self.layers.iter().enumerate() {
            let prefix = Self::key_prefix(entry, i);
            for (key, value) in entry.layer.state_dict() {
                state.insert(format!("{prefix}.{key}"), value);
            }
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        for (i, entry) in self.layers.iter_mut().enumerate() {
            let prefix = format!("{}.", Self::key_prefix(entry, i));
            let mut sub_state = StateDict::new();
            for (key, value) in state {
                if let Some(sub_key) = key.strip_prefix(&prefix) {
                    if !sub_key.is_empty() {
                        sub_state.insert(sub_key.to_string(), value.clone());
                    }
                }
            }
            if !sub_state.is_empty() {
                entry.layer.load_state_dict(&sub_state)?;
            }
        }
        Ok(())
    }

    fn train(&mut self, mode: bool) {
        for entry in &mut self.layers {
            entry.layer.train(mode);
        }
    }
}
