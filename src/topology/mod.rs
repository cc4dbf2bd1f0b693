//! Forwarder topology
//!
//! Read-only snapshot of forwarders, their weighted interconnections,
//! and the service functions each one hosts. Graph-aware selection
//! policies query it for shortest paths.
//!
//! # Submodules
//!
//! - [`graph`]: `TopologyGraph` and Dijkstra path queries

pub mod graph;

pub use graph::{PathCost, TopologyError, TopologyGraph};
