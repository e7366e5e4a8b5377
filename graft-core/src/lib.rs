//! Graft core types, traits, and launch planning for the fused graph
//! attention kernels.

pub mod backend;
pub mod config;
pub mod diag;
pub mod error;
pub mod graph;
pub mod launch;
pub mod plan;
pub mod reference;
pub mod shape;
pub mod tensor;
pub mod types;

pub use backend::GatBackend;
pub use config::GatKernelConfig;
pub use error::{GraftError, Result};
pub use graph::CsrGraph;
pub use launch::{Dim3, LaunchGeometry};
pub use plan::{FusedGatParams, FusedGatPlan, GatArrays};
pub use shape::GatShapes;
pub use tensor::{GraphView, Tensor};
pub use types::*;
