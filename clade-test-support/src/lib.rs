//! Shared test utilities used across clade crates.

pub mod fixtures;
pub mod tracing;
