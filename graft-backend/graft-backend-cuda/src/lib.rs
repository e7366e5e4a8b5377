//! Graft CUDA backend using cudarc.

pub mod backend;
pub mod tensor;

pub use backend::CudaBackend;
pub use tensor::{CudaGraph, CudaTensor};
