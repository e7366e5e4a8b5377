//! Graft CUDA kernel source strings.
//!
//! Each module exports an `F32_SRC` constant containing CUDA C source code
//! and the names of the `extern "C"` entry points it defines. The CUDA
//! backend compiles these at runtime via NVRTC.

pub mod fused_gat;
