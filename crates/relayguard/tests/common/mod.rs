//! Common test utilities
//!
//! Event fixtures, a deterministic language classifier and tracing setup shared
//! by the integration tests.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

// vim: ts=4
