//! Chain scheduling
//!
//! `ChainScheduler` walks a chain in order and resolves every position
//! to a concrete service function: a pinned hop from the path request
//! when one exists, otherwise whatever the configured selection policy
//! picks. Scheduling is all-or-nothing; a single unschedulable position
//! fails the whole chain.
//!
//! # Service Index
//!
//! Each hop carries `starting_index - position`. A chain may have at most
//! `starting_index` positions so the last hop keeps an index of at least 1.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{Chain, PathRequest};
use crate::selection::{SelectionContext, SelectionError, SelectionPolicy};

/// Default service index of the first hop
pub const DEFAULT_STARTING_INDEX: u8 = 255;

/// Error types for scheduling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Chain has no positions
    #[error("Chain {0} has no service functions")]
    EmptyChain(String),

    /// Chain is longer than the service index allows
    #[error("Chain {chain} has {len} positions but starting index is {starting_index}")]
    ServiceIndexExhausted {
        chain: String,
        len: usize,
        starting_index: u8,
    },

    /// A position could not be resolved
    #[error("Chain {chain} is unschedulable at position {position}: {source}")]
    Unschedulable {
        chain: String,
        position: usize,
        #[source]
        source: SelectionError,
    },
}

/// One scheduled chain position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledHop {
    /// Chain position
    pub position: usize,
    /// Selected or pinned service function
    pub service_function: String,
    /// Forwarder, when known
    pub forwarder: Option<String>,
    /// Service index for this hop
    pub service_index: u8,
}

/// Drives a selection policy across every position of a chain
#[derive(Debug, Clone)]
pub struct ChainScheduler {
    policy: SelectionPolicy,
}

impl ChainScheduler {
    /// Create a scheduler around `policy`
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// The policy used for unpinned positions
    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Resolve every position of `chain`
    ///
    /// Pins in `request` are matched by position and used verbatim, without
    /// checking the pinned service function's type. Unpinned positions go
    /// to the policy together with the hops chosen so far.
    ///
    /// # Errors
    ///
    /// - `EmptyChain` - the chain has no positions
    /// - `ServiceIndexExhausted` - the chain is longer than `starting_index`
    /// - `Unschedulable` - the policy failed at some position; no partial
    ///   result is returned
    #[allow(clippy::cast_possible_truncation)]
    pub fn schedule(
        &self,
        ctx: &SelectionContext<'_>,
        chain: &Chain,
        starting_index: u8,
        request: &PathRequest,
    ) -> Result<Vec<ScheduledHop>, ScheduleError> {
        if chain.is_empty() {
            return Err(ScheduleError::EmptyChain(chain.name.clone()));
        }
        if chain.len() > usize::from(starting_index) {
            return Err(ScheduleError::ServiceIndexExhausted {
                chain: chain.name.clone(),
                len: chain.len(),
                starting_index,
            });
        }

        let mut hops: Vec<ScheduledHop> = Vec::with_capacity(chain.len());

        for (position, element) in chain.elements.iter().enumerate() {
            // Bounded by the length check above
            let service_index = starting_index - position as u8;

            let hop = if let Some(pin) = request.pin_at(position) {
                let name = pin.service_function.clone().unwrap_or_default();
                let forwarder = pin
                    .forwarder
                    .clone()
                    .or_else(|| ctx.topology.forwarder_of(&name).map(String::from));
                debug!(
                    chain = %chain.name,
                    position,
                    service_function = %name,
                    "Using pinned hop"
                );
                ScheduledHop {
                    position,
                    service_function: name,
                    forwarder,
                    service_index,
                }
            } else {
                let name = self
                    .policy
                    .select(ctx, &element.sf_type, position, &hops)
                    .map_err(|source| ScheduleError::Unschedulable {
                        chain: chain.name.clone(),
                        position,
                        source,
                    })?;
                let forwarder = ctx.topology.forwarder_of(&name).map(String::from);
                ScheduledHop {
                    position,
                    service_function: name,
                    forwarder,
                    service_index,
                }
            };

            hops.push(hop);
        }

        info!(
            chain = %chain.name,
            policy = %self.policy.kind(),
            hops = hops.len(),
            "Chain scheduled"
        );
        Ok(hops)
    }
}
