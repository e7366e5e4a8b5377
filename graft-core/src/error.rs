use thiserror::Error;

use crate::types::Device;

#[derive(Error, Debug)]
pub enum GraftError {
    #[error("CUDA error: {0}")]
    Cuda(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Device placement: `{name}` is on {got}, expected {expected}")]
    DevicePlacement {
        name: &'static str,
        expected: Device,
        got: Device,
    },

    #[error("Device-to-host transfer failed: {0}")]
    Transfer(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraftError>;
