//! Service function, forwarder, and chain definitions
//!
//! These are the read-only inputs consumed through
//! [`DefinitionReader`](crate::store::DefinitionReader). All types are
//! serde-enabled so the same shapes can be loaded from the `topology`
//! section of the configuration file.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Default weight for forwarder links and locators that carry none
pub const DEFAULT_WEIGHT: u32 = 1;

/// Opaque service function type tag (e.g. `"firewall"`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceFunctionType(String);

impl ServiceFunctionType {
    /// Create a type tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Get the tag as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceFunctionType {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for ServiceFunctionType {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// Data-plane locator of a service function or forwarder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPlaneLocator {
    /// Locator IP address
    pub ip: IpAddr,
    /// Locator port
    pub port: u16,
    /// Optional locator weight used by weighted path selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl DataPlaneLocator {
    /// Create an unweighted locator
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            ip,
            port,
            weight: None,
        }
    }

    /// Set the weight
    #[must_use]
    pub const fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A concrete, named service function instance bound to one forwarder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFunction {
    /// Unique instance name
    pub name: String,
    /// Service function type
    #[serde(rename = "type")]
    pub sf_type: ServiceFunctionType,
    /// Hosting forwarder name
    pub forwarder: String,
    /// Externally reported CPU utilization (percent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<u32>,
    /// Instance may belong to at most one active rendered path
    #[serde(default)]
    pub one_chain_only: bool,
    /// Data-plane locators
    #[serde(default)]
    pub locators: Vec<DataPlaneLocator>,
}

impl ServiceFunction {
    /// Create a service function hosted on `forwarder`
    pub fn new(
        name: impl Into<String>,
        sf_type: impl Into<ServiceFunctionType>,
        forwarder: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sf_type: sf_type.into(),
            forwarder: forwarder.into(),
            load: None,
            one_chain_only: false,
            locators: Vec::new(),
        }
    }

    /// Set the reported load
    #[must_use]
    pub fn with_load(mut self, load: u32) -> Self {
        self.load = Some(load);
        self
    }

    /// Set the exclusivity flag
    #[must_use]
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.one_chain_only = exclusive;
        self
    }

    /// Add a data-plane locator
    #[must_use]
    pub fn with_locator(mut self, locator: DataPlaneLocator) -> Self {
        self.locators.push(locator);
        self
    }

    /// Weight used by weighted selection: the first weighted locator, else 1
    #[must_use]
    pub fn locator_weight(&self) -> u32 {
        self.locators
            .iter()
            .find_map(|l| l.weight)
            .unwrap_or(DEFAULT_WEIGHT)
    }
}

/// Directed, optionally weighted link from one forwarder to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderLink {
    /// Neighbor forwarder name
    pub to: String,
    /// Weight of this direction (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// A forwarder through which chained traffic transits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forwarder {
    /// Unique forwarder name
    pub name: String,
    /// Names of attached service functions
    #[serde(default)]
    pub service_functions: Vec<String>,
    /// Links to neighbor forwarders
    #[serde(default)]
    pub links: Vec<ForwarderLink>,
    /// Data-plane locators
    #[serde(default)]
    pub locators: Vec<DataPlaneLocator>,
}

impl Forwarder {
    /// Create a forwarder with no attachments or links
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_functions: Vec::new(),
            links: Vec::new(),
            locators: Vec::new(),
        }
    }

    /// Attach a service function by name
    #[must_use]
    pub fn with_service_function(mut self, name: impl Into<String>) -> Self {
        self.service_functions.push(name.into());
        self
    }

    /// Add a link with the default weight
    #[must_use]
    pub fn with_link(mut self, to: impl Into<String>) -> Self {
        self.links.push(ForwarderLink {
            to: to.into(),
            weight: None,
        });
        self
    }

    /// Add a weighted link
    #[must_use]
    pub fn with_weighted_link(mut self, to: impl Into<String>, weight: u32) -> Self {
        self.links.push(ForwarderLink {
            to: to.into(),
            weight: Some(weight),
        });
        self
    }

    /// Add a data-plane locator
    #[must_use]
    pub fn with_locator(mut self, locator: DataPlaneLocator) -> Self {
        self.locators.push(locator);
        self
    }
}

/// One position of a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainElement {
    /// Element name, informational
    #[serde(default)]
    pub name: String,
    /// Required service function type
    #[serde(rename = "type")]
    pub sf_type: ServiceFunctionType,
}

/// Ordered sequence of required service function types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Unique chain name
    pub name: String,
    /// Elements in traversal order; the index is the position
    pub elements: Vec<ChainElement>,
    /// Render a reverse-direction path alongside the forward one
    #[serde(default)]
    pub symmetric: bool,
}

impl Chain {
    /// Build a chain from a list of types, naming elements after their type
    pub fn from_types<I, T>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ServiceFunctionType>,
    {
        let elements = types
            .into_iter()
            .map(|t| {
                let sf_type = t.into();
                ChainElement {
                    name: sf_type.to_string(),
                    sf_type,
                }
            })
            .collect();

        Self {
            name: name.into(),
            elements,
            symmetric: false,
        }
    }

    /// Set the symmetric flag
    #[must_use]
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Number of positions
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the chain has no positions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
