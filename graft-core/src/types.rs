use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a buffer lives.
///
/// `Host` is the memory of the host SIMT emulator; `Cuda(ordinal)` is global
/// memory on a CUDA device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Host,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Host => write!(f, "host"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}
