//! Launch geometry for the score and aggregate kernels.
//!
//! Score kernel, grid `(1, gy)`, block `(bx, by)`:
//! `threadIdx.x` walks heads, block row `threadIdx.y` owns one destination
//! vertex per epoch, and the grid strides over vertices in steps of
//! `gy * by`. Shared memory holds one `er` row per block row.
//!
//! Aggregate kernel, grid `(gx, gy)`, block `(bx, by)`:
//! `blockIdx.y` walks vertices with stride `gy`, the global x index walks
//! heads with stride `gx * bx`, and `threadIdx.y` walks channels with stride
//! `by`. Each stride comes from its own axis.

use std::fmt;

use crate::config::GatKernelConfig;
use crate::shape::{suggest_blocks, suggest_threads, GatShapes};
use crate::{GraftError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }

    pub fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.x, self.y, self.z)
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub grid: Dim3,
    pub block: Dim3,
    pub shared_mem_bytes: u32,
}

impl fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grid={} block={} smem={}B",
            self.grid, self.block, self.shared_mem_bytes
        )
    }
}

const F32_BYTES: u32 = std::mem::size_of::<f32>() as u32;

pub fn score_geometry(shapes: &GatShapes, config: &GatKernelConfig) -> Result<LaunchGeometry> {
    let bx = suggest_threads(shapes.e_xlen, config.score_head_threads);
    let mut by = suggest_threads(shapes.n, config.max_threads_per_block / bx);

    let row_bytes = (shapes.e_xlen as u64) * F32_BYTES as u64;
    if row_bytes > config.max_shared_mem_bytes as u64 {
        return Err(GraftError::InvalidArgument(format!(
            "{} heads need {row_bytes}B of shared memory per vertex, limit is {}B",
            shapes.e_xlen, config.max_shared_mem_bytes
        )));
    }
    while by > 1 && by as u64 * row_bytes > config.max_shared_mem_bytes as u64 {
        by >>= 1;
    }

    let gy = suggest_blocks(shapes.n, by, config.max_blocks);
    Ok(LaunchGeometry {
        grid: Dim3::new(1, gy),
        block: Dim3::new(bx, by),
        shared_mem_bytes: (by as u64 * row_bytes) as u32,
    })
}

pub fn aggregate_geometry(shapes: &GatShapes, config: &GatKernelConfig) -> LaunchGeometry {
    let bx = suggest_threads(shapes.e_xlen, config.aggregate_head_threads);
    let by = suggest_threads(shapes.feat_src_hidden, config.max_threads_per_block / bx);
    let gx = suggest_blocks(shapes.e_xlen, bx, config.max_blocks);
    let gy = shapes.n.clamp(1, config.max_blocks as usize) as u32;
    LaunchGeometry {
        grid: Dim3::new(gx, gy),
        block: Dim3::new(bx, by),
        shared_mem_bytes: 0,
    }
}
