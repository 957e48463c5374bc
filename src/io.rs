use crate::error::{HistonetError, Result};
use crate::nn::Module;
use crate::tensor::Tensor;
use bincode::{config, Decode, Encode};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub type StateDict = BTreeMap<String, TensorData>;

/// Serializable representation of tensor data
#[derive(Encode, Decode, Clone, Debug, PartialEq)]
pub struct TensorData {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl TensorData {
    pub fn from_tensor(t: &Tensor) -> Self {
        TensorData {
            data: t.data().to_vec(),
            shape: t.shape().to_vec(),
        }
    }

    pub fn to_tensor(&self) -> Result<Tensor> {
        Tensor::new(self.data.clone(), &self.shape)
    }
}

/// Summary of differences between two state dicts.
///
/// `expected` is usually taken from `model.state_dict()`, and `loaded` is
/// what was deserialized or passed in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateDictDiff {
    /// Keys that exist in `expected` but are missing from `loaded`.
    pub missing_keys: Vec<String>,
    /// Keys that exist in `loaded` but not in `expected`.
    pub unexpected_keys: Vec<String>,
    /// Keys present in both, but with differing shapes:
    /// `(key, expected_shape, loaded_shape)`.
    pub shape_mismatches: Vec<(String, Vec<usize>, Vec<usize>)>,
}

impl StateDictDiff {
    /// True if there are no missing, unexpected, or shape-mismatched keys.
    pub fn is_empty(&self) -> bool {
        self.missing_keys.is_empty()
            && self.unexpected_keys.is_empty()
            && self.shape_mismatches.is_empty()
    }
}

/// Compute a diff between an "expected" and a "loaded" state dict.
///
/// Purely informational; mutates nothing.
pub fn diff_state_dict(expected: &StateDict, loaded: &StateDict) -> StateDictDiff {
    let mut diff = StateDictDiff::default();

    for (key, expected_td) in expected.iter() {
        match loaded.get(key) {
            None => diff.missing_keys.push(key.clone()),
            Some(actual_td) => {
                if expected_td.shape != actual_td.shape {
                    diff.shape_mismatches.push((
                        key.clone(),
                        expected_td.shape.clone(),
                        actual_td.shape.clone(),
                    ));
                }
            }
        }
    }

    for key in loaded.keys() {
        if !expected.contains_key(key) {
            diff.unexpected_keys.push(key.clone());
        }
    }

    diff
}

/// Load a state dict and report which keys were missing, unexpected or
/// shape-mismatched.
pub fn load_state_dict_checked<M: Module + ?Sized>(
    module: &mut M,
    state: &StateDict,
) -> Result<StateDictDiff> {
    let expected = module.state_dict();
    let diff = diff_state_dict(&expected, state);
    module.load_state_dict(state)?;
    Ok(diff)
}

pub fn save_state_dict<P: AsRef<Path>>(state: &StateDict, path: P) -> Result<()> {
    let encoded = bincode::encode_to_vec(state, config::standard())
        .map_err(|e| HistonetError::Codec(e.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(&encoded)?;
    Ok(())
}

pub fn load_state_dict<P: AsRef<Path>>(path: P) -> Result<StateDict> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    let (state, _): (StateDict, _) = bincode::decode_from_slice(&buffer, config::standard())
        .map_err(|e| HistonetError::Codec(e.to_string()))?;
    Ok(state)
}

#[cfg(test)]
mod io_tests {
    use super::*;
    use crate::nn::layers::{Linear, ReLU, Sequential};
    use crate::nn::Module;

    fn small_model() -> Sequential {
        Sequential::new(vec![
            Box::new(Linear::new(2, 3, true).unwrap()),
            Box::new(ReLU),
            Box::new(Linear::new(3, 1, true).unwrap()),
        ])
    }

    #[test]
    fn test_save_load_sequential() {
        let model = small_model();

        let path = std::env::temp_dir().join("histonet_test_seq.bin");

        let state = model.state_dict();
        save_state_dict(&state, &path).unwrap();

        let mut model2 = small_model();

        // Xavier init makes the weights differ before loading
        let p1 = model.parameters();
        let p2 = model2.parameters();
        assert_ne!(p1[0].data(), p2[0].data());

        let loaded_state = load_state_dict(&path).unwrap();
        model2.load_state_dict(&loaded_state).unwrap();

        let p1 = model.parameters();
        let p2 = model2.parameters();
        for (t1, t2) in p1.iter().zip(p2.iter()) {
            assert_eq!(t1.data(), t2.data());
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_state_dict_diff_reports_mismatches() {
        let layer = Linear::new(2, 3, true).unwrap();
        let expected = layer.state_dict();

        // One missing key, one unexpected key, one shape mismatch.
        let mut loaded = expected.clone();
        loaded.remove("bias");
        loaded.insert(
            "extra".to_string(),
            TensorData {
                data: vec![0.0],
                shape: vec![1],
            },
        );
        if let Some(td) = loaded.get_mut("weight") {
            td.shape = vec![999];
        }

        let diff = diff_state_dict(&expected, &loaded);
        assert!(!diff.is_empty());
        assert!(diff.missing_keys.contains(&"bias".to_string()));
        assert!(diff.unexpected_keys.contains(&"extra".to_string()));
        assert!(diff
            .shape_mismatches
            .iter()
            .any(|(k, _exp, _act)| k == "weight"));
    }

    #[test]
    fn test_load_checked_reports_clean_diff_for_matching_state() {
        let mut model = small_model();
        let state = model.state_dict();
        let diff = load_state_dict_checked(&mut model, &state).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_tensor_data_roundtrip() {
        let t = Tensor::randn(&[2, 3]);
        let td = TensorData::from_tensor(&t);
        let back = td.to_tensor().unwrap();
        assert_eq!(back.shape(), t.shape());
        assert_eq!(back.data(), t.data());
    }

    #[test]
    fn test_tensor_data_rejects_bad_shape() {
        let td = TensorData {
            data: vec![1.0, 2.0],
            shape: vec![3],
        };
        assert!(td.to_tensor().is_err());
    }
}
