use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GraftError, Result};

/// Largest y/z grid extent CUDA accepts.
pub const MAX_GRID_BLOCKS: u32 = 65535;

/// Dynamic shared memory a launch may request without opting in per kernel.
pub const MAX_SHARED_MEM_BYTES: u32 = 48 * 1024;

/// Launch-geometry limits for the two fused kernels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatKernelConfig {
    /// Hard cap on threads per block.
    #[serde(default = "default_max_threads_per_block")]
    pub max_threads_per_block: u32,
    /// Cap on blocks along any grid axis.
    #[serde(default = "default_max_blocks")]
    pub max_blocks: u32,
    /// Threads along the head axis of a score-kernel block.
    #[serde(default = "default_score_head_threads")]
    pub score_head_threads: u32,
    /// Threads along the head axis of an aggregate-kernel block.
    #[serde(default = "default_aggregate_head_threads")]
    pub aggregate_head_threads: u32,
    /// Dynamic shared memory available to the score kernel's `er` cache.
    #[serde(default = "default_max_shared_mem_bytes")]
    pub max_shared_mem_bytes: u32,
}

fn default_max_threads_per_block() -> u32 {
    1024
}
fn default_max_blocks() -> u32 {
    MAX_GRID_BLOCKS
}
fn default_score_head_threads() -> u32 {
    32
}
fn default_aggregate_head_threads() -> u32 {
    4
}
fn default_max_shared_mem_bytes() -> u32 {
    MAX_SHARED_MEM_BYTES
}

impl Default for GatKernelConfig {
    fn default() -> Self {
        Self {
            max_threads_per_block: default_max_threads_per_block(),
            max_blocks: default_max_blocks(),
            score_head_threads: default_score_head_threads(),
            aggregate_head_threads: default_aggregate_head_threads(),
            max_shared_mem_bytes: default_max_shared_mem_bytes(),
        }
    }
}

impl GatKernelConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_threads_per_block", self.max_threads_per_block),
            ("score_head_threads", self.score_head_threads),
            ("aggregate_head_threads", self.aggregate_head_threads),
        ] {
            if value == 0 || !value.is_power_of_two() {
                return Err(GraftError::Config(format!(
                    "{name} must be a non-zero power of two, got {value}"
                )));
            }
        }
        if self.score_head_threads > self.max_threads_per_block
            || self.aggregate_head_threads > self.max_threads_per_block
        {
            return Err(GraftError::Config(
                "head thread counts cannot exceed max_threads_per_block".into(),
            ));
        }
        if self.max_blocks == 0 || self.max_blocks > MAX_GRID_BLOCKS {
            return Err(GraftError::Config(format!(
                "max_blocks must be in 1..={MAX_GRID_BLOCKS}, got {}",
                self.max_blocks
            )));
        }
        let min_shared = std::mem::size_of::<f32>() as u32;
        if !(min_shared..=MAX_SHARED_MEM_BYTES).contains(&self.max_shared_mem_bytes) {
            return Err(GraftError::Config(format!(
                "max_shared_mem_bytes must be in {min_shared}..={MAX_SHARED_MEM_BYTES}, got {}",
                self.max_shared_mem_bytes
            )));
        }
        Ok(())
    }
}
