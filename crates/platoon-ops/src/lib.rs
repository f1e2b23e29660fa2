//! High-level operations behind the `platoon` commands.

pub mod ops_resolve;
