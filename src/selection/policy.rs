//! Service function selection policies
//!
//! A policy picks one concrete service function for one chain position.
//! Policies are a closed enum; each variant carries only the shared
//! state it needs and is dispatched with a `match`.
//!
//! # Policies
//!
//! | Policy | Selection rule |
//! |--------|----------------|
//! | `Random` | Uniform among instances of the type |
//! | `RoundRobin` | Per-type rotating cursor shared across calls |
//! | `LoadBalance` | Lowest reported CPU load, first found on ties |
//! | `ShortestPath` | Fewest forwarder hops from the previous hop |
//! | `WeightedShortestPath` | Lowest edge weight sum plus locator weight |
//! | `LoadPathAware` | Lowest `LoadPathScorer` score of path cost and load |
//!
//! Graph-aware policies anchor on the forwarder of the previous hop. The
//! first position anchors on the configured home forwarder; without one
//! every candidate starts at cost 0 and enumeration order decides.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::scoring::LoadPathScorer;
use super::state::{RandomSource, RotationState};
use crate::chain::scheduler::ScheduledHop;
use crate::model::ServiceFunctionType;
use crate::store::DefinitionReader;
use crate::topology::{PathCost, TopologyGraph};

/// Load assumed for service functions that report no metric
pub const UNKNOWN_LOAD: u32 = 100;

/// Selection algorithm name, as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerType {
    /// Uniform random
    Random,
    /// Per-type rotation (DEFAULT)
    #[default]
    RoundRobin,
    /// Lowest CPU load
    LoadBalance,
    /// Fewest forwarder hops
    ShortestPath,
    /// Lowest weighted distance
    WeightedShortestPath,
    /// Combined path cost and load
    LoadPathAware,
}

impl SchedulerType {
    /// Every scheduler type
    pub const ALL: [Self; 6] = [
        Self::Random,
        Self::RoundRobin,
        Self::LoadBalance,
        Self::ShortestPath,
        Self::WeightedShortestPath,
        Self::LoadPathAware,
    ];

    /// Parse a scheduler name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "random" => Some(Self::Random),
            "round_robin" => Some(Self::RoundRobin),
            "load_balance" => Some(Self::LoadBalance),
            "shortest_path" => Some(Self::ShortestPath),
            "weighted_shortest_path" => Some(Self::WeightedShortestPath),
            "load_path_aware" => Some(Self::LoadPathAware),
            _ => None,
        }
    }

    /// Get the name as a static string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RoundRobin => "round_robin",
            Self::LoadBalance => "load_balance",
            Self::ShortestPath => "shortest_path",
            Self::WeightedShortestPath => "weighted_shortest_path",
            Self::LoadPathAware => "load_path_aware",
        }
    }
}

impl std::fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for selection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// No instance of the required type exists
    #[error("No service functions of type {0}")]
    NoServiceFunctions(ServiceFunctionType),

    /// Instances exist but none is reachable from the anchor forwarder
    #[error("No service function of type {sf_type} reachable from forwarder {from}")]
    Unreachable {
        sf_type: ServiceFunctionType,
        from: String,
    },
}

/// Inputs shared by every selection within one scheduling call
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Topology snapshot
    pub topology: &'a TopologyGraph,
    /// Source of load metrics
    pub definitions: &'a dyn DefinitionReader,
}

impl<'a> SelectionContext<'a> {
    /// Bundle a topology snapshot with a definition reader
    pub fn new(topology: &'a TopologyGraph, definitions: &'a dyn DefinitionReader) -> Self {
        Self {
            topology,
            definitions,
        }
    }

    fn load_of(&self, service_function: &str) -> u32 {
        self.definitions
            .load_metric_of(service_function)
            .unwrap_or(UNKNOWN_LOAD)
    }
}

/// A selection policy and the state it needs
#[derive(Debug, Clone)]
pub enum SelectionPolicy {
    /// Uniform random
    Random(Arc<RandomSource>),
    /// Per-type rotation
    RoundRobin(Arc<RotationState>),
    /// Lowest CPU load
    LoadBalance,
    /// Fewest forwarder hops
    ShortestPath { home: Option<String> },
    /// Lowest weighted distance plus locator weight
    WeightedShortestPath { home: Option<String> },
    /// Lowest combined score
    LoadPathAware {
        home: Option<String>,
        scorer: LoadPathScorer,
    },
}

impl SelectionPolicy {
    /// Scheduler type of this policy
    #[must_use]
    pub const fn kind(&self) -> SchedulerType {
        match self {
            Self::Random(_) => SchedulerType::Random,
            Self::RoundRobin(_) => SchedulerType::RoundRobin,
            Self::LoadBalance => SchedulerType::LoadBalance,
            Self::ShortestPath { .. } => SchedulerType::ShortestPath,
            Self::WeightedShortestPath { .. } => SchedulerType::WeightedShortestPath,
            Self::LoadPathAware { .. } => SchedulerType::LoadPathAware,
        }
    }

    /// Pick a service function of `sf_type` for `position`
    ///
    /// `already_chosen` holds the hops selected for earlier positions, in
    /// chain order.
    ///
    /// # Errors
    ///
    /// - `NoServiceFunctions` - the topology has no instance of the type
    /// - `Unreachable` - a graph-aware policy found no reachable instance
    #[allow(clippy::cast_precision_loss)]
    pub fn select(
        &self,
        ctx: &SelectionContext<'_>,
        sf_type: &ServiceFunctionType,
        position: usize,
        already_chosen: &[ScheduledHop],
    ) -> Result<String, SelectionError> {
        let candidates = ctx.topology.service_functions_of_type(sf_type);
        if candidates.is_empty() {
            return Err(SelectionError::NoServiceFunctions(sf_type.clone()));
        }

        let selected = match self {
            Self::Random(rng) => &candidates[rng.pick(candidates.len())],
            Self::RoundRobin(rotation) => &candidates[rotation.advance(sf_type, candidates.len())],
            Self::LoadBalance => {
                let mut best = &candidates[0];
                let mut best_load = ctx.load_of(best);
                for candidate in &candidates[1..] {
                    let load = ctx.load_of(candidate);
                    if load < best_load {
                        best = candidate;
                        best_load = load;
                    }
                }
                best
            }
            Self::ShortestPath { home } => {
                let anchor = anchor_forwarder(already_chosen, home.as_deref());
                rank_by_path(ctx, sf_type, candidates, anchor, PathCost::Hops, |_, cost| {
                    cost as f64
                })?
            }
            Self::WeightedShortestPath { home } => {
                let anchor = anchor_forwarder(already_chosen, home.as_deref());
                rank_by_path(ctx, sf_type, candidates, anchor, PathCost::Weighted, |sf, cost| {
                    (cost + u64::from(ctx.topology.locator_weight(sf))) as f64
                })?
            }
            Self::LoadPathAware { home, scorer } => {
                let anchor = anchor_forwarder(already_chosen, home.as_deref());
                rank_by_path(ctx, sf_type, candidates, anchor, PathCost::Weighted, |sf, cost| {
                    scorer.score(cost, ctx.load_of(sf))
                })?
            }
        };

        debug!(
            policy = %self.kind(),
            sf_type = %sf_type,
            position,
            selected = %selected,
            "Service function selected"
        );
        Ok(selected.clone())
    }
}

/// Forwarder the next hop is measured from
///
/// The previous hop's forwarder when there is one; the home forwarder
/// for the first position. A previous hop without a resolved forwarder
/// leaves the position unanchored.
fn anchor_forwarder<'a>(already_chosen: &'a [ScheduledHop], home: Option<&'a str>) -> Option<&'a str> {
    match already_chosen.last() {
        Some(previous) => previous.forwarder.as_deref(),
        None => home,
    }
}

/// Lowest-scoring reachable candidate, first found on ties
#[allow(clippy::cast_precision_loss)]
fn rank_by_path<'c, F>(
    ctx: &SelectionContext<'_>,
    sf_type: &ServiceFunctionType,
    candidates: &'c [String],
    anchor: Option<&str>,
    cost: PathCost,
    score: F,
) -> Result<&'c String, SelectionError>
where
    F: Fn(&str, u64) -> f64,
{
    let mut best: Option<(&String, f64)> = None;

    for candidate in candidates {
        let path_cost = match anchor {
            None => 0,
            Some(from) => {
                let Some(to) = ctx.topology.forwarder_of(candidate) else {
                    continue;
                };
                match ctx.topology.shortest_path(from, to, cost) {
                    Ok((_, c)) => c,
                    Err(e) => {
                        trace!(candidate = %candidate, error = %e, "Candidate skipped");
                        continue;
                    }
                }
            }
        };

        let candidate_score = score(candidate, path_cost);
        if best.map_or(true, |(_, s)| candidate_score < s) {
            best = Some((candidate, candidate_score));
        }
    }

    best.map(|(c, _)| c).ok_or_else(|| SelectionError::Unreachable {
        sf_type: sf_type.clone(),
        from: anchor.unwrap_or_default().to_string(),
    })
}

/// Builds policies that share one rotation state and one random source
#[derive(Debug, Clone)]
pub struct PolicySet {
    rotation: Arc<RotationState>,
    random: Arc<RandomSource>,
    home: Option<String>,
    scorer: LoadPathScorer,
}

impl PolicySet {
    /// Create with fresh state and no home forwarder
    pub fn new() -> Self {
        Self {
            rotation: Arc::new(RotationState::new()),
            random: Arc::new(RandomSource::new()),
            home: None,
            scorer: LoadPathScorer::default(),
        }
    }

    /// Use a deterministic random source
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random = Arc::new(RandomSource::with_seed(seed));
        self
    }

    /// Anchor graph-aware policies on `home` for the first position
    #[must_use]
    pub fn with_home_forwarder(mut self, home: Option<String>) -> Self {
        self.home = home;
        self
    }

    /// Replace the load-path scoring function
    #[must_use]
    pub fn with_scorer(mut self, scorer: LoadPathScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Share an existing rotation state
    #[must_use]
    pub fn with_rotation(mut self, rotation: Arc<RotationState>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Shared round-robin state; call `reset()` on it between test cases
    pub fn rotation(&self) -> &Arc<RotationState> {
        &self.rotation
    }

    /// Policy of the given kind
    pub fn policy(&self, kind: SchedulerType) -> SelectionPolicy {
        match kind {
            SchedulerType::Random => SelectionPolicy::Random(Arc::clone(&self.random)),
            SchedulerType::RoundRobin => SelectionPolicy::RoundRobin(Arc::clone(&self.rotation)),
            SchedulerType::LoadBalance => SelectionPolicy::LoadBalance,
            SchedulerType::ShortestPath => SelectionPolicy::ShortestPath {
                home: self.home.clone(),
            },
            SchedulerType::WeightedShortestPath => SelectionPolicy::WeightedShortestPath {
                home: self.home.clone(),
            },
            SchedulerType::LoadPathAware => SelectionPolicy::LoadPathAware {
                home: self.home.clone(),
                scorer: self.scorer.clone(),
            },
        }
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new()
    }
}
