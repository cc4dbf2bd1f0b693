//! sfc-renderer: Service function chain path renderer
//!
//! This crate turns abstract service function chains (ordered lists of
//! service types) into rendered service paths: concrete service function
//! instances bound to forwarders, tagged with a 24-bit path id and a
//! decrementing service index.
//!
//! # Features
//!
//! - **Path Id Allocation**: Random or sequential ids with conflict detection
//! - **Six Selection Policies**: Random, round robin, load balance, shortest
//!   path, weighted shortest path, and load-path aware
//! - **Pinned Hops**: Per-request overrides for individual chain positions
//! - **Symmetric Paths**: Reverse-direction mirrors with paired ids
//! - **Exclusivity**: `one_chain_only` service functions serve one path
//!
//! # Architecture
//!
//! ```text
//! DefinitionReader ──> TopologyGraph ──> SelectionPolicy
//!                                             │
//! PathRequest ──> RenderedPathBuilder ──> ChainScheduler
//!                        │
//!                 PathIdAllocator ──> StateStore
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sfc_renderer::chain::RenderedPathBuilder;
//! use sfc_renderer::config::load_config;
//! use sfc_renderer::store::{MemoryDefinitions, MemoryStateStore};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("/etc/sfc-renderer/config.json")?;
//!
//! let definitions = Arc::new(MemoryDefinitions::from_config(&config.topology));
//! let store = Arc::new(MemoryStateStore::new());
//! let builder = RenderedPathBuilder::from_config(&config, definitions, store);
//!
//! for request in &config.paths {
//!     let paths = builder.render(request)?;
//!     println!("{} -> {}", paths.forward.name, paths.forward.path_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`chain`]: Path id allocation, scheduling, and path lifecycle
//! - [`config`]: Configuration types and loading
//! - [`error`]: Error types
//! - [`model`]: Definitions and rendered path types
//! - [`selection`]: Service function selection policies
//! - [`store`]: Definition and state store interfaces
//! - [`topology`]: Forwarder graph and shortest paths

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod chain;
pub mod config;
pub mod error;
pub mod model;
pub mod selection;
pub mod store;
pub mod topology;

// Re-export commonly used types at the crate root
pub use chain::{
    ChainScheduler, IdGenerationAlgorithm, PathIdAllocator, PathIdAllocatorError, RenderError,
    RenderedPathBuilder, ScheduleError,
};
pub use config::{Config, LogConfig, SchedulerConfig};
pub use error::{ConfigError, SfcError};
pub use model::{
    Chain, FirstHop, Forwarder, Hop, HopOverride, PathRequest, RenderedPath, RenderedPaths,
    ServiceFunction, ServiceFunctionType,
};
pub use selection::{PolicySet, SchedulerType, SelectionPolicy};
pub use store::{DefinitionReader, MemoryDefinitions, MemoryStateStore, StateStore, StoreError};
pub use topology::{TopologyError, TopologyGraph};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
