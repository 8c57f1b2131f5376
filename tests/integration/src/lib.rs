//! Integration test utilities for the event hub
//!
//! This crate provides helpers for running end-to-end tests against a real
//! gateway listening on an ephemeral port.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
