//! Configuration types for sfc-renderer
//!
//! This module defines all configuration structures used by the renderer.
//! Configuration is loaded from JSON files and validated at startup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::chain::allocator::IdGenerationAlgorithm;
use crate::chain::scheduler::DEFAULT_STARTING_INDEX;
use crate::error::ConfigError;
use crate::model::{
    Chain, DataPlaneLocator, Forwarder, PathRequest, ServiceFunction, REVERSE_PATH_SUFFIX,
};
use crate::selection::{LoadPathScorer, PolicySet, SchedulerType};
use crate::topology::TopologyGraph;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Path id allocation
    #[serde(default)]
    pub allocator: AllocatorConfig,

    /// Service function scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Forwarder, service function, and chain definitions
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Path requests rendered at startup
    #[serde(default)]
    pub paths: Vec<PathRequest>,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.log.validate()?;

        // Topology must form a consistent graph
        let graph = TopologyGraph::build(&self.topology.forwarders, &self.topology.service_functions)
            .map_err(|e| ConfigError::ValidationError(format!("Invalid topology: {e}")))?;

        if let Some(home) = &self.scheduler.home_forwarder {
            if !graph.contains_forwarder(home) {
                return Err(ConfigError::ValidationError(format!(
                    "Home forwarder '{home}' not found in topology"
                )));
            }
        }

        let mut chains: HashSet<&str> = HashSet::new();
        for chain in &self.topology.chains {
            if chain.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Chain name cannot be empty".into(),
                ));
            }
            if !chains.insert(&chain.name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate chain name: {}",
                    chain.name
                )));
            }
        }

        let mut names: HashSet<&str> = HashSet::new();
        for path in &self.paths {
            if path.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Path name cannot be empty".into(),
                ));
            }
            if path.name.ends_with(REVERSE_PATH_SUFFIX) {
                return Err(ConfigError::ValidationError(format!(
                    "Path name '{}' uses the reserved suffix {REVERSE_PATH_SUFFIX}",
                    path.name
                )));
            }
            if !names.insert(&path.name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate path name: {}",
                    path.name
                )));
            }
            if !chains.contains(path.chain.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Path '{}' references unknown chain '{}'",
                    path.name, path.chain
                )));
            }
            if path.starting_index == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "Path '{}' has starting_index 0",
                    path.name
                )));
            }
        }

        Ok(())
    }

    /// Create a small working configuration
    ///
    /// Two linked forwarders, a firewall and a DPI instance on each, one
    /// symmetric chain, and one path request for it.
    #[must_use]
    pub fn default_config() -> Self {
        let locator = |last: u8| DataPlaneLocator::new([10, 0, 0, last].into(), 6633);

        let topology = TopologyConfig {
            forwarders: vec![
                Forwarder::new("sff-1").with_link("sff-2").with_locator(locator(1)),
                Forwarder::new("sff-2").with_locator(locator(2)),
            ],
            service_functions: vec![
                ServiceFunction::new("firewall-1", "firewall", "sff-1"),
                ServiceFunction::new("dpi-1", "dpi", "sff-1"),
                ServiceFunction::new("firewall-2", "firewall", "sff-2"),
                ServiceFunction::new("dpi-2", "dpi", "sff-2"),
            ],
            chains: vec![Chain::from_types("web", ["firewall", "dpi"]).with_symmetric(true)],
        };

        Self {
            allocator: AllocatorConfig::default(),
            scheduler: SchedulerConfig::default(),
            topology,
            paths: vec![PathRequest::new("web-path", "web")],
            log: LogConfig::default(),
        }
    }
}

/// Path id allocation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AllocatorConfig {
    /// Id generation algorithm: "random" or "sequential"
    #[serde(default)]
    pub algorithm: IdGenerationAlgorithm,

    /// Seed for the random generator (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Default scheduler type
    #[serde(default)]
    pub policy: SchedulerType,

    /// Service index of the first hop
    #[serde(default = "default_starting_index")]
    pub starting_index: u8,

    /// Forwarder anchoring graph-aware policies at the first position
    #[serde(default)]
    pub home_forwarder: Option<String>,

    /// Seed for random selection (entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Weights for load-path-aware selection
    #[serde(default)]
    pub load_path: LoadPathConfig,
}

impl SchedulerConfig {
    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_index == 0 {
            return Err(ConfigError::ValidationError(
                "starting_index must be greater than 0".into(),
            ));
        }
        self.load_path.validate()
    }

    /// Policy set built from this configuration
    #[must_use]
    pub fn policy_set(&self) -> PolicySet {
        let policies = PolicySet::new()
            .with_home_forwarder(self.home_forwarder.clone())
            .with_scorer(self.load_path.scorer());
        match self.seed {
            Some(seed) => policies.with_seed(seed),
            None => policies,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: SchedulerType::default(),
            starting_index: DEFAULT_STARTING_INDEX,
            home_forwarder: None,
            seed: None,
            load_path: LoadPathConfig::default(),
        }
    }
}

/// Linear weights for the load-path-aware score
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LoadPathConfig {
    /// Weight of the forwarder path cost
    #[serde(default = "default_weight")]
    pub path_weight: f64,

    /// Weight of the CPU load
    #[serde(default = "default_weight")]
    pub load_weight: f64,
}

impl LoadPathConfig {
    /// Validate weights
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("path_weight", self.path_weight), ("load_weight", self.load_weight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "load_path.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Linear scorer with these weights
    #[must_use]
    pub fn scorer(&self) -> LoadPathScorer {
        LoadPathScorer::linear(self.path_weight, self.load_weight)
    }
}

impl Default for LoadPathConfig {
    fn default() -> Self {
        Self {
            path_weight: default_weight(),
            load_weight: default_weight(),
        }
    }
}

/// Definition snapshot served to the renderer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TopologyConfig {
    /// Service function forwarders
    #[serde(default)]
    pub forwarders: Vec<Forwarder>,

    /// Service function instances
    #[serde(default)]
    pub service_functions: Vec<ServiceFunction>,

    /// Service function chains
    #[serde(default)]
    pub chains: Vec<Chain>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include target (module path)
    #[serde(default = "default_true")]
    pub target: bool,
}

impl LogConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.level
            )));
        }
        if self.format != "json" && self.format != "text" {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format: {} (expected json or text)",
                self.format
            )));
        }
        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
            target: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_starting_index() -> u8 {
    DEFAULT_STARTING_INDEX
}

const fn default_weight() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "json".into()
}
