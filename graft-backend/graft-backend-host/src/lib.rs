//! Host backend for Graft: a SIMT emulator for the fused GAT kernels.

mod backend;
mod simt;
pub mod tensor;

pub use backend::HostBackend;
pub use tensor::HostTensor;
