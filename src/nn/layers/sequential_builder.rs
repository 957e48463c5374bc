use super::sequential::{LayerEntry, Sequential};
use crate::nn::Module;

/// Builder for constructing Sequential models with named or unnamed layers
///
/// # Examples
///
/// ```
/// use histonet::nn::layers::{Linear, ReLU, Sequential};
///
/// let model = Sequential::builder()
///     .add_named("encoder", Box::new(Linear::new(784, 128, true).unwrap()))
///     .add_unnamed(Box::new(ReLU))
///     .add_named("decoder", Box::new(Linear::new(128, 10, true).unwrap()))
///     .build();
/// ```
pub struct SequentialBuilder {
    entries: Vec<LayerEntry>,
}

impl SequentialBuilder {
    /// Create a new empty builder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an unnamed layer; it gets a numeric index in the state dict.
    #[must_use]
    pub fn add_unnamed(mut self, layer: Box<dyn Module>) -> Self {
        self.entries.push(LayerEntry { name: None, layer });
        self
    }

    /// Add a named layer. Empty strings are treated as unnamed.
    #[must_use]
    pub fn add_named(mut self, name: impl Into<String>, layer: Box<dyn Module>) -> Self {
        let name_str = name.into();
        let name_opt = if name_str.is_empty() {
            None
        } else {
            Some(name_str)
        };

        self.entries.push(LayerEntry {
            name: name_opt,
            layer,
        });
        self
    }

    /// Build the Sequential model from the accumulated layers
    #[must_use]
    pub fn build(self) -> Sequential {
        Sequential {
            layers: self.entries,
        }
    }
}

impl Default for SequentialBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::layers::{Linear, ReLU};

    #[test]
    fn test_builder_empty() {
        let model = SequentialBuilder::new().build();
        assert_eq!(model.len(), 0);
    }

    #[test]
    fn test_builder_named_and_unnamed() {
        let model = SequentialBuilder::new()
            .add_named("fc1", Box::new(Linear::new(2, 3, true).unwrap()))
            .add_unnamed(Box::new(ReLU))
            .add_named("fc2", Box::new(Linear::new(3, 1, true).unwrap()))
            .build();

        assert_eq!(model.len(), 3);
        let names = model.layer_names();
        assert_eq!(names.first().copied().unwrap_or(None), Some("fc1"));
        assert_eq!(names.get(1).copied().unwrap_or(None), None);
        assert_eq!(names.get(2).copied().unwrap_or(None), Some("fc2"));
    }

    #[test]
    fn test_builder_empty_string_name_is_unnamed() {
        let model = SequentialBuilder::new()
            .add_named("", Box::new(Linear::new(2, 3, true).unwrap()))
            .build();

        assert_eq!(model.layer_names().first().copied().unwrap_or(None), None);
    }

    #[test]
    fn test_named_layers_key_state_dict() {
        use crate::nn::Module;

        let model = SequentialBuilder::new()
            .add_named("fc1", Box::new(Linear::new(2, 3, true).unwrap()))
            .build();

        let state = model.state_dict();
        assert!(state.contains_key("fc1.weight"));
        assert!(state.contains_key("fc1.bias"));
    }
}
