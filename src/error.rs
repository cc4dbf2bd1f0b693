//! Error types for sfc-renderer
//!
//! This module defines the top-level error hierarchy. Each subsystem owns
//! its error enum next to its code; `SfcError` aggregates them for
//! callers that only need a single type.

use std::io;

use thiserror::Error;

use crate::chain::allocator::PathIdAllocatorError;
use crate::chain::builder::RenderError;
use crate::chain::scheduler::ScheduleError;
use crate::store::StoreError;
use crate::topology::TopologyError;

/// Top-level error type for sfc-renderer
#[derive(Debug, Error)]
pub enum SfcError {
    /// Configuration errors (file parsing, validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rendered path lifecycle errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Chain scheduling errors
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Topology construction errors
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Path id allocation errors
    #[error("Path id error: {0}")]
    PathId(#[from] PathIdAllocatorError),

    /// External state store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors not covered by other categories
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SfcError {
    /// Check if this error is recoverable (can retry operation)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::Topology(_) | Self::Store(_) => false,
            Self::Render(e) => e.is_recoverable(),
            Self::Schedule(_) => true,
            Self::PathId(e) => e.is_recoverable(),
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found or inaccessible
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error (invalid values, missing required fields)
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Environment variable error
    #[error("Environment variable error: {name}: {reason}")]
    EnvError { name: String, reason: String },

    /// I/O error while reading config
    #[error("I/O error reading configuration: {0}")]
    IoError(#[from] io::Error),
}

impl ConfigError {
    /// Config errors are generally not recoverable without user intervention
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }
}
