//! Forwarder connectivity graph
//!
//! A [`TopologyGraph`] is an immutable snapshot built once per scheduling
//! call. Nodes are forwarders; edges are directed and weighted. A link
//! declared only in one direction is reachable both ways, with the
//! undeclared direction carrying the default weight.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::model::{Forwarder, ServiceFunction, ServiceFunctionType, DEFAULT_WEIGHT};
use crate::store::DefinitionReader;

/// Error types for topology construction and queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Two forwarders share a name
    #[error("Duplicate forwarder: {0}")]
    DuplicateForwarder(String),

    /// Two service functions share a name
    #[error("Duplicate service function: {0}")]
    DuplicateServiceFunction(String),

    /// Reference to a forwarder that does not exist
    #[error("Forwarder not found: {0}")]
    UnknownForwarder(String),

    /// Service function attached to two different forwarders
    #[error("Service function {name} is attached to both {first} and {second}")]
    ConflictingAttachment {
        name: String,
        first: String,
        second: String,
    },

    /// No path between two forwarders
    #[error("No path from forwarder {from} to {to}")]
    Unreachable { from: String, to: String },
}

/// How path cost is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCost {
    /// Every edge costs 1
    Hops,
    /// Edges cost their declared weight
    Weighted,
}

/// Read-only adjacency view used by graph-aware selection policies
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    graph: DiGraph<String, u64>,
    nodes: HashMap<String, NodeIndex>,
    /// Service function name -> hosting forwarder
    hosts: HashMap<String, String>,
    /// Service function name -> locator weight
    locator_weights: HashMap<String, u32>,
    /// Type -> service function names, name-sorted
    by_type: HashMap<ServiceFunctionType, Vec<String>>,
}

impl TopologyGraph {
    /// Snapshot the topology exposed by a definition reader
    ///
    /// # Errors
    ///
    /// See [`TopologyGraph::build`].
    pub fn from_definitions(definitions: &dyn DefinitionReader) -> Result<Self, TopologyError> {
        Self::build(&definitions.forwarders(), &definitions.service_functions())
    }

    /// Build a topology from forwarder and service function definitions
    ///
    /// # Errors
    ///
    /// - `DuplicateForwarder` / `DuplicateServiceFunction` - names collide
    /// - `UnknownForwarder` - a link or a service function references a
    ///   forwarder that is not defined
    /// - `ConflictingAttachment` - a service function is claimed by two
    ///   forwarders
    pub fn build(
        forwarders: &[Forwarder],
        service_functions: &[ServiceFunction],
    ) -> Result<Self, TopologyError> {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::with_capacity(forwarders.len());

        for fwd in forwarders {
            if nodes.contains_key(&fwd.name) {
                return Err(TopologyError::DuplicateForwarder(fwd.name.clone()));
            }
            let index = graph.add_node(fwd.name.clone());
            nodes.insert(fwd.name.clone(), index);
        }

        // Declared directions win; missing reverse directions default to 1
        let mut weights: BTreeMap<(NodeIndex, NodeIndex), u64> = BTreeMap::new();
        for fwd in forwarders {
            let from = nodes[&fwd.name];
            for link in &fwd.links {
                let to = *nodes
                    .get(&link.to)
                    .ok_or_else(|| TopologyError::UnknownForwarder(link.to.clone()))?;
                let weight = u64::from(link.weight.unwrap_or(DEFAULT_WEIGHT));
                weights.insert((from, to), weight);
            }
        }
        let declared: Vec<(NodeIndex, NodeIndex)> = weights.keys().copied().collect();
        for (from, to) in declared {
            weights
                .entry((to, from))
                .or_insert(u64::from(DEFAULT_WEIGHT));
        }
        for ((from, to), weight) in weights {
            if from != to {
                graph.add_edge(from, to, weight);
            }
        }

        let mut hosts: HashMap<String, String> = HashMap::new();
        let mut locator_weights = HashMap::with_capacity(service_functions.len());
        let mut by_type: HashMap<ServiceFunctionType, Vec<String>> = HashMap::new();

        for sf in service_functions {
            if locator_weights.contains_key(&sf.name) {
                return Err(TopologyError::DuplicateServiceFunction(sf.name.clone()));
            }
            if !nodes.contains_key(&sf.forwarder) {
                return Err(TopologyError::UnknownForwarder(sf.forwarder.clone()));
            }
            hosts.insert(sf.name.clone(), sf.forwarder.clone());
            locator_weights.insert(sf.name.clone(), sf.locator_weight());
            by_type
                .entry(sf.sf_type.clone())
                .or_default()
                .push(sf.name.clone());
        }

        // Attachment lists on forwarders must agree with the instances' own view
        for fwd in forwarders {
            for name in &fwd.service_functions {
                match hosts.entry(name.clone()) {
                    Entry::Occupied(existing) if existing.get() != &fwd.name => {
                        return Err(TopologyError::ConflictingAttachment {
                            name: name.clone(),
                            first: existing.get().clone(),
                            second: fwd.name.clone(),
                        });
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(slot) => {
                        slot.insert(fwd.name.clone());
                    }
                }
            }
        }

        for names in by_type.values_mut() {
            names.sort();
        }

        debug!(
            forwarders = nodes.len(),
            edges = graph.edge_count(),
            service_functions = locator_weights.len(),
            "Topology snapshot built"
        );

        Ok(Self {
            graph,
            nodes,
            hosts,
            locator_weights,
            by_type,
        })
    }

    /// Service functions of `sf_type` in stable enumeration order
    #[must_use]
    pub fn service_functions_of_type(&self, sf_type: &ServiceFunctionType) -> &[String] {
        self.by_type
            .get(sf_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Forwarder hosting `service_function`
    #[must_use]
    pub fn forwarder_of(&self, service_function: &str) -> Option<&str> {
        self.hosts.get(service_function).map(String::as_str)
    }

    /// Locator weight of `service_function` (default 1)
    #[must_use]
    pub fn locator_weight(&self, service_function: &str) -> u32 {
        self.locator_weights
            .get(service_function)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT)
    }

    /// Whether `forwarder` is a node of the graph
    #[must_use]
    pub fn contains_forwarder(&self, forwarder: &str) -> bool {
        self.nodes.contains_key(forwarder)
    }

    /// Whether `service_function` is attached to some forwarder
    #[must_use]
    pub fn contains_service_function(&self, service_function: &str) -> bool {
        self.hosts.contains_key(service_function)
    }

    /// Number of forwarders
    #[must_use]
    pub fn forwarder_count(&self) -> usize {
        self.nodes.len()
    }

    /// Weight of the directed edge `from -> to`, if any
    #[must_use]
    pub fn edge_weight(&self, from: &str, to: &str) -> Option<u64> {
        let a = *self.nodes.get(from)?;
        let b = *self.nodes.get(to)?;
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e).copied())
    }

    /// Cheapest forwarder path from `from` to `to` and its cost
    ///
    /// Runs Dijkstra (A* with a zero heuristic). A forwarder reaches
    /// itself at cost 0.
    ///
    /// # Errors
    ///
    /// - `UnknownForwarder` - either endpoint is not in the graph
    /// - `Unreachable` - no path connects the endpoints
    pub fn shortest_path(
        &self,
        from: &str,
        to: &str,
        cost: PathCost,
    ) -> Result<(Vec<String>, u64), TopologyError> {
        let start = *self
            .nodes
            .get(from)
            .ok_or_else(|| TopologyError::UnknownForwarder(from.to_string()))?;
        let goal = *self
            .nodes
            .get(to)
            .ok_or_else(|| TopologyError::UnknownForwarder(to.to_string()))?;

        let found = match cost {
            PathCost::Hops => astar(&self.graph, start, |n| n == goal, |_| 1_u64, |_| 0),
            PathCost::Weighted => {
                astar(&self.graph, start, |n| n == goal, |e| *e.weight(), |_| 0)
            }
        };

        let (total, route) = found.ok_or_else(|| TopologyError::Unreachable {
            from: from.to_string(),
            to: to.to_string(),
        })?;

        let names = route
            .into_iter()
            .map(|index| self.graph[index].clone())
            .collect();
        Ok((names, total))
    }
}
