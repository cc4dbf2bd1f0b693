//! Path requests and rendered paths

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::selection::SchedulerType;

/// Suffix appended to a path name to name its reverse-direction mirror
pub const REVERSE_PATH_SUFFIX: &str = "-Reverse";

/// Explicit hop pin for one chain position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopOverride {
    /// Chain position this pin applies to
    pub position: usize,
    /// Service function used verbatim at this position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_function: Option<String>,
    /// Forwarder to bind the hop to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<String>,
}

impl HopOverride {
    /// Pin a service function (and optionally its forwarder) at `position`
    pub fn new(position: usize, service_function: impl Into<String>) -> Self {
        Self {
            position,
            service_function: Some(service_function.into()),
            forwarder: None,
        }
    }

    /// Set the forwarder
    #[must_use]
    pub fn on_forwarder(mut self, forwarder: impl Into<String>) -> Self {
        self.forwarder = Some(forwarder.into());
        self
    }
}

/// Request to render a chain into a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Name of the path to create
    pub name: String,
    /// Name of the chain to render
    pub chain: String,
    /// Explicit hop pins
    #[serde(default)]
    pub hops: Vec<HopOverride>,
    /// Pre-chosen path id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_id: Option<u32>,
    /// Starting service index, defaults to the configured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_index: Option<u8>,
    /// Overrides the chain's symmetric flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric: Option<bool>,
    /// Overrides the configured scheduler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerType>,
}

impl PathRequest {
    /// Create a request with no pins or overrides
    pub fn new(name: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: chain.into(),
            hops: Vec::new(),
            path_id: None,
            starting_index: None,
            symmetric: None,
            scheduler: None,
        }
    }

    /// Add a hop pin
    #[must_use]
    pub fn with_hop(mut self, hop: HopOverride) -> Self {
        self.hops.push(hop);
        self
    }

    /// Request a specific path id
    #[must_use]
    pub fn with_path_id(mut self, path_id: u32) -> Self {
        self.path_id = Some(path_id);
        self
    }

    /// Set the starting service index
    #[must_use]
    pub fn with_starting_index(mut self, index: u8) -> Self {
        self.starting_index = Some(index);
        self
    }

    /// Override the chain's symmetric flag
    #[must_use]
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = Some(symmetric);
        self
    }

    /// Override the scheduler
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerType) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Pin for `position`, if any. The last matching pin wins.
    #[must_use]
    pub fn pin_at(&self, position: usize) -> Option<&HopOverride> {
        self.hops
            .iter()
            .rev()
            .find(|h| h.position == position && h.service_function.is_some())
    }
}

/// One resolved hop of a rendered path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// Position in the path
    pub position: usize,
    /// Service function name
    pub service_function: String,
    /// Forwarder name
    pub forwarder: String,
    /// Decrementing service index
    pub service_index: u8,
}

/// A concrete, ordered, identified realization of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPath {
    /// Unique path name
    pub name: String,
    /// Unique path id (24-bit)
    pub path_id: u32,
    /// Originating chain name
    pub chain: String,
    /// Hops in traversal order
    pub hops: Vec<Hop>,
    /// Service index of the first hop
    pub starting_index: u8,
    /// Name of the mirror path, if one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_path: Option<String>,
    /// Path id of the mirror path, if one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_path_id: Option<u32>,
    /// This path is the reverse direction of another
    #[serde(default)]
    pub reverse_path: bool,
}

impl RenderedPath {
    /// First hop, if the path has any
    #[must_use]
    pub fn first_hop(&self) -> Option<&Hop> {
        self.hops.first()
    }

    /// Last hop, if the path has any
    #[must_use]
    pub fn last_hop(&self) -> Option<&Hop> {
        self.hops.last()
    }

    /// Service function names in traversal order
    pub fn service_functions(&self) -> impl Iterator<Item = &str> {
        self.hops.iter().map(|h| h.service_function.as_str())
    }
}

/// A forward path and its optional mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPaths {
    /// Forward path
    pub forward: RenderedPath,
    /// Reverse path for symmetric chains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<RenderedPath>,
}

/// Where a classifier should send the first packet of a flow
///
/// The default value is the well-formed "no such path" answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstHop {
    /// Locator IP of the first hop's forwarder
    pub ip: Option<IpAddr>,
    /// Locator port of the first hop's forwarder
    pub port: u16,
    /// Path id
    pub path_id: u32,
    /// Starting service index
    pub starting_index: u8,
    /// Mirror path id
    pub symmetric_path_id: Option<u32>,
}

impl FirstHop {
    /// Whether this is the empty result
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ip.is_none()
    }
}
