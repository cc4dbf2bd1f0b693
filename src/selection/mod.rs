//! Service function selection
//!
//! This module implements the six pluggable algorithms that pick a
//! concrete service function instance for one chain position.
//!
//! # Submodules
//!
//! - [`policy`]: `SelectionPolicy` enum, `SchedulerType`, `PolicySet`
//! - [`scoring`]: pluggable `LoadPathScorer`
//! - [`state`]: shared round-robin cursors and random source

pub mod policy;
pub mod scoring;
pub mod state;

pub use policy::{
    PolicySet, SchedulerType, SelectionContext, SelectionError, SelectionPolicy, UNKNOWN_LOAD,
};
pub use scoring::LoadPathScorer;
pub use state::{RandomSource, RotationState};
