//! NIQE metrics workspace facade
//!
//! Re-exports [`niqe_core`] so the workspace-level integration tests and
//! benchmarks can reach the pipeline through a single crate.

pub use niqe_core::*;
