//! Shared utilities for platoon.
//!
//! This crate provides the cross-cutting concerns used by the other platoon
//! crates: the unified error type and Cargo-style terminal status output.

pub mod errors;
pub mod progress;
