//! Dependency resolution engine.
//!
//! A run expands a candidate graph from the root's dependencies, picks one
//! version per module, aligns platform members, and repeats with the new
//! alignment constraints until nothing changes. See [`propagator::Propagator`].

pub mod alignment;
pub mod builder;
pub mod cache;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod propagator;
pub mod provider;
pub mod resolver;
