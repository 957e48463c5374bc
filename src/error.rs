use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistonetError {
    #[error("shape {shape:?} implies {elements} elements but data length is {len}")]
    ShapeDataMismatch {
        shape: Vec<usize>,
        elements: usize,
        len: usize,
    },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("expected rank-{expected} tensor, got rank-{actual}")]
    RankMismatch { expected: usize, actual: usize },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, HistonetError>;
