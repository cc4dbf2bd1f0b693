//! Rendered service path construction
//!
//! This module turns chains into rendered paths.
//!
//! # Overview
//!
//! The chain module handles:
//! - Path id allocation with conflict detection (random or sequential)
//! - Scheduling a chain onto concrete service functions
//! - Rendered path lifecycle (create, mirror, look up, delete)
//! - Exclusivity of `one_chain_only` service functions
//!
//! # Submodules
//!
//! - [`allocator`]: `PathIdAllocator` for the 24-bit path id space
//! - [`scheduler`]: `ChainScheduler`, pins and policy-driven selection
//! - [`builder`]: `RenderedPathBuilder` for path lifecycle management
//!
//! # Flow
//!
//! ```text
//! PathRequest ──> ChainScheduler ──> resolve hops ──> commit
//!                      │                                │
//!                 SelectionPolicy          exclusivity + PathIdAllocator
//!                                                       │
//!                                                  StateStore
//! ```

pub mod allocator;
pub mod builder;
pub mod scheduler;

// Re-export commonly used types
pub use allocator::{
    IdGenerationAlgorithm, PathIdAllocator, PathIdAllocatorError, MAX_PATH_ID, MIN_PATH_ID,
    SYMMETRIC_DIRECTION_BIT,
};
pub use builder::{RenderError, RenderedPathBuilder};
pub use scheduler::{ChainScheduler, ScheduleError, ScheduledHop, DEFAULT_STARTING_INDEX};
