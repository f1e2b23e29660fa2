//! Core data types for platoon.
//!
//! This crate defines the vocabulary shared by the resolver and its callers:
//! module identities and versions, dependencies and exclusions, version
//! requirements and ordering schemes, constraints, platform rules, module
//! descriptors and catalogs, resolution requests, and configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod constraint;
pub mod dependency;
pub mod descriptor;
pub mod identity;
pub mod platform;
pub mod request;
pub mod requirement;
pub mod version;
