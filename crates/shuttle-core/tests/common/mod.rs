//! Shared helpers for pipeline integration tests.

pub mod fixtures;
