//! Support code for the `graft` binary.

pub mod synth;
