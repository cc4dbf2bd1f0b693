//! Configuration module for sfc-renderer
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use sfc_renderer::config::{load_config, Config};
//!
//! let config = load_config("/etc/sfc-renderer/config.json").unwrap();
//! println!("Default scheduler: {}", config.scheduler.policy);
//! ```

mod loader;
mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{
    AllocatorConfig, Config, LoadPathConfig, LogConfig, SchedulerConfig, TopologyConfig,
};
