//! `RenderedPathBuilder` - rendered service path lifecycle
//!
//! This module turns path requests into persisted, identified rendered
//! paths and manages their symmetric mirrors.
//!
//! # Path Creation
//!
//! 1. Read the chain and snapshot the topology
//! 2. Schedule every chain position (pins first, policy otherwise)
//! 3. Check that every service function and forwarder exists
//! 4. Inside the commit critical section:
//!    - reject exclusive service functions already claimed by another path
//!    - allocate the path id (requested or generated)
//!    - record exclusivity claims and persist the path
//!
//! A failure at any point of step 4 rolls back the claims and the id, so
//! no partial state is ever left behind. Deletion keeps an undo log of the
//! same kind and restores it when the store fails partway.
//!
//! # Symmetric Paths
//!
//! The mirror of `<name>` is `<name>-Reverse`: same hops in reverse order,
//! id from [`PathIdAllocator::check_and_allocate_symmetric`]. The two
//! paths reference each other by name and id only; either can be deleted
//! on its own. The mirror shares the original's exclusivity claims; when
//! the original is deleted first, its claims pass to the surviving mirror.
//!
//! [`RenderedPathBuilder::render`] commits the original and its mirror in
//! one critical section, so the paired id is reserved before any other
//! caller can allocate.
//!
//! # Lock Order
//!
//! `commit_lock` is the only lock held by this type. Store and allocator
//! calls made under it must not call back into the builder. Methods with a
//! `_locked` suffix expect the caller to hold it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::chain::allocator::{PathIdAllocator, PathIdAllocatorError};
use crate::chain::scheduler::{ChainScheduler, ScheduleError, ScheduledHop, DEFAULT_STARTING_INDEX};
use crate::config::Config;
use crate::model::{
    Chain, FirstHop, Hop, PathRequest, RenderedPath, RenderedPaths, ServiceFunctionType,
    REVERSE_PATH_SUFFIX,
};
use crate::selection::{PolicySet, SchedulerType, SelectionContext, SelectionPolicy};
use crate::store::{DefinitionReader, StateStore, StoreError};
use crate::topology::{TopologyError, TopologyGraph};

/// Error types for rendered path operations
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Path name already in use
    #[error("Rendered path already exists: {0}")]
    AlreadyExists(String),

    /// Chain not defined
    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    /// Path not found
    #[error("Rendered path not found: {0}")]
    PathNotFound(String),

    /// Scheduled service function is not part of the topology
    #[error("Service function not found in topology: {0}")]
    UnknownServiceFunction(String),

    /// Pinned forwarder is not part of the topology
    #[error("Forwarder not found in topology: {0}")]
    UnknownForwarder(String),

    /// Exclusive service function already used by another active path
    #[error("Service function {service_function} is exclusive and already used by path {path}")]
    ExclusivityConflict {
        service_function: String,
        path: String,
    },

    /// Topology snapshot could not be built
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Chain could not be scheduled
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Path id allocation failed
    #[error("Path id error: {0}")]
    PathId(#[from] PathIdAllocatorError),

    /// External state store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RenderError {
    /// Check if the operation can be retried or corrected by the caller
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(_) | Self::Topology(_) => false,
            Self::PathId(e) => e.is_recoverable(),
            Self::AlreadyExists(_)
            | Self::ChainNotFound(_)
            | Self::PathNotFound(_)
            | Self::UnknownServiceFunction(_)
            | Self::UnknownForwarder(_)
            | Self::ExclusivityConflict { .. }
            | Self::Schedule(_) => true,
        }
    }
}

/// Builds, mirrors, looks up, and deletes rendered paths
///
/// # Thread Safety
///
/// Scheduling runs without locks. The exclusivity check, id allocation,
/// claim recording, and persistence of one path form a single critical
/// section, as does deletion, so two concurrent creations can never both
/// claim the same exclusive service function. A symmetric render extends
/// that section over the mirror.
pub struct RenderedPathBuilder {
    definitions: Arc<dyn DefinitionReader>,
    store: Arc<dyn StateStore>,
    allocator: Arc<PathIdAllocator>,
    policies: PolicySet,
    default_scheduler: SchedulerType,
    starting_index: u8,
    commit_lock: Mutex<()>,
}

impl RenderedPathBuilder {
    /// Create a builder with round-robin scheduling and starting index 255
    pub fn new(
        definitions: Arc<dyn DefinitionReader>,
        store: Arc<dyn StateStore>,
        allocator: Arc<PathIdAllocator>,
    ) -> Self {
        Self {
            definitions,
            store,
            allocator,
            policies: PolicySet::new(),
            default_scheduler: SchedulerType::default(),
            starting_index: DEFAULT_STARTING_INDEX,
            commit_lock: Mutex::new(()),
        }
    }

    /// Create a builder configured from `config`
    ///
    /// The allocator is created here from the `allocator` section.
    pub fn from_config(
        config: &Config,
        definitions: Arc<dyn DefinitionReader>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let allocator = match config.allocator.seed {
            Some(seed) => PathIdAllocator::with_seed(config.allocator.algorithm, seed),
            None => PathIdAllocator::new(config.allocator.algorithm),
        };

        let scheduler = &config.scheduler;
        Self::new(definitions, store, Arc::new(allocator))
            .with_policies(scheduler.policy_set())
            .with_default_scheduler(scheduler.policy)
            .with_starting_index(scheduler.starting_index)
    }

    /// Replace the policy set
    #[must_use]
    pub fn with_policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    /// Scheduler used when a request names none
    #[must_use]
    pub fn with_default_scheduler(mut self, scheduler: SchedulerType) -> Self {
        self.default_scheduler = scheduler;
        self
    }

    /// Starting service index used when a request names none
    #[must_use]
    pub fn with_starting_index(mut self, index: u8) -> Self {
        self.starting_index = index;
        self
    }

    /// Shared path id allocator
    pub fn allocator(&self) -> &Arc<PathIdAllocator> {
        &self.allocator
    }

    /// Shared policy set
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Scheduler used when a request names none
    pub fn default_scheduler(&self) -> SchedulerType {
        self.default_scheduler
    }

    /// Create a rendered path using the request's scheduler or the default
    ///
    /// # Errors
    ///
    /// - `ChainNotFound` - the chain is not defined
    /// - `AlreadyExists` - a path with this name exists
    /// - `Schedule` - some position could not be scheduled
    /// - `UnknownServiceFunction` / `UnknownForwarder` - a pinned hop names
    ///   something outside the topology
    /// - `ExclusivityConflict` - an exclusive service function is taken
    /// - `PathId` - the requested id is taken or the id space is exhausted
    /// - `Store` - the state store failed
    pub fn create_path(&self, request: &PathRequest) -> Result<RenderedPath, RenderError> {
        let policy = self.policy_for(request);
        self.create_path_with(request, &policy)
    }

    /// Create a rendered path with an explicit selection policy
    ///
    /// # Errors
    ///
    /// See [`create_path`](Self::create_path).
    pub fn create_path_with(
        &self,
        request: &PathRequest,
        policy: &SelectionPolicy,
    ) -> Result<RenderedPath, RenderError> {
        let chain = self
            .definitions
            .read_chain(&request.chain)
            .ok_or_else(|| RenderError::ChainNotFound(request.chain.clone()))?;
        self.create_for_chain(request, &chain, policy)
    }

    /// Create a path and, when the request or chain asks for it, its mirror
    ///
    /// Both paths are created or neither is.
    ///
    /// # Errors
    ///
    /// See [`create_path`](Self::create_path) and
    /// [`create_symmetric_path`](Self::create_symmetric_path).
    pub fn render(&self, request: &PathRequest) -> Result<RenderedPaths, RenderError> {
        let chain = self
            .definitions
            .read_chain(&request.chain)
            .ok_or_else(|| RenderError::ChainNotFound(request.chain.clone()))?;
        let policy = self.policy_for(request);
        let prepared = self.prepare(request, &chain, &policy)?;

        let _guard = self.commit_lock.lock();
        let mut forward = self.insert_locked(request, &chain, prepared)?;

        if !request.symmetric.unwrap_or(chain.symmetric) {
            return Ok(RenderedPaths {
                forward,
                reverse: None,
            });
        }

        match self.create_symmetric_locked(&forward) {
            Ok(reverse) => {
                forward.symmetric_path = Some(reverse.name.clone());
                forward.symmetric_path_id = Some(reverse.path_id);
                Ok(RenderedPaths {
                    forward,
                    reverse: Some(reverse),
                })
            }
            Err(e) => {
                warn!(path = %forward.name, error = %e, "Symmetric path failed, removing forward path");
                if let Err(cleanup) = self.delete_locked(&forward.name) {
                    warn!(path = %forward.name, error = %cleanup, "Failed to remove forward path");
                }
                Err(e)
            }
        }
    }

    /// Render an ad-hoc chain built from a list of types
    ///
    /// The path and its implicit chain share `name`.
    ///
    /// # Errors
    ///
    /// See [`create_path`](Self::create_path).
    pub fn render_type_list(
        &self,
        name: &str,
        types: &[ServiceFunctionType],
    ) -> Result<RenderedPath, RenderError> {
        let chain = Chain::from_types(name, types.iter().cloned());
        let request = PathRequest::new(name, name);
        let policy = self.policies.policy(self.default_scheduler);
        self.create_for_chain(&request, &chain, &policy)
    }

    /// Render an ad-hoc chain and return its first hop
    ///
    /// # Errors
    ///
    /// See [`render_type_list`](Self::render_type_list).
    pub fn first_hop_by_type_list(
        &self,
        name: &str,
        types: &[ServiceFunctionType],
    ) -> Result<FirstHop, RenderError> {
        let path = self.render_type_list(name, types)?;
        self.read_first_hop(&path.name)
    }

    /// Create the reverse-direction mirror of `original`
    ///
    /// # Errors
    ///
    /// - `PathNotFound` - `original` is no longer stored
    /// - `AlreadyExists` - the mirror name is taken or `original` already
    ///   has a mirror
    /// - `PathId` - the paired id is taken or out of range
    /// - `Store` - the state store failed
    pub fn create_symmetric_path(&self, original: &RenderedPath) -> Result<RenderedPath, RenderError> {
        let _guard = self.commit_lock.lock();
        self.create_symmetric_locked(original)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn create_symmetric_locked(&self, original: &RenderedPath) -> Result<RenderedPath, RenderError> {
        let name = format!("{}{REVERSE_PATH_SUFFIX}", original.name);

        let mut forward = self
            .store
            .get_rendered_path(&original.name)?
            .ok_or_else(|| RenderError::PathNotFound(original.name.clone()))?;
        if let Some(existing) = &forward.symmetric_path {
            return Err(RenderError::AlreadyExists(existing.clone()));
        }
        if self.store.get_rendered_path(&name)?.is_some() {
            return Err(RenderError::AlreadyExists(name));
        }

        let path_id = self.allocator.check_and_allocate_symmetric(forward.path_id)?;

        // Hop count never exceeds the starting index (checked at scheduling)
        let hops = forward
            .hops
            .iter()
            .rev()
            .enumerate()
            .map(|(position, hop)| Hop {
                position,
                service_function: hop.service_function.clone(),
                forwarder: hop.forwarder.clone(),
                service_index: forward.starting_index - position as u8,
            })
            .collect();

        let reverse = RenderedPath {
            name,
            path_id,
            chain: forward.chain.clone(),
            hops,
            starting_index: forward.starting_index,
            symmetric_path: Some(forward.name.clone()),
            symmetric_path_id: Some(forward.path_id),
            reverse_path: true,
        };
        forward.symmetric_path = Some(reverse.name.clone());
        forward.symmetric_path_id = Some(path_id);

        if let Err(e) = self.store.put_rendered_path(&reverse) {
            self.allocator.free(path_id);
            return Err(e.into());
        }
        if let Err(e) = self.store.put_rendered_path(&forward) {
            if let Err(cleanup) = self.store.delete_rendered_path(&reverse.name) {
                warn!(path = %reverse.name, error = %cleanup, "Failed to roll back symmetric path");
            }
            self.allocator.free(path_id);
            return Err(e.into());
        }

        info!(
            path = %reverse.name,
            path_id,
            original = %forward.name,
            original_id = forward.path_id,
            "Created symmetric rendered path"
        );
        Ok(reverse)
    }

    /// Locator of the first hop's forwarder for `path_name`
    ///
    /// A missing path, or a first forwarder without a data-plane locator,
    /// yields `FirstHop::default()`.
    ///
    /// # Errors
    ///
    /// Returns `Store` only when the state store itself fails.
    pub fn read_first_hop(&self, path_name: &str) -> Result<FirstHop, RenderError> {
        let Some(path) = self.store.get_rendered_path(path_name)? else {
            debug!(path = %path_name, "First hop requested for unknown path");
            return Ok(FirstHop::default());
        };

        let locator = path
            .first_hop()
            .and_then(|hop| self.definitions.read_forwarder(&hop.forwarder))
            .and_then(|fwd| fwd.locators.first().cloned());
        let Some(locator) = locator else {
            warn!(path = %path_name, "First hop forwarder has no data-plane locator");
            return Ok(FirstHop::default());
        };

        Ok(FirstHop {
            ip: Some(locator.ip),
            port: locator.port,
            path_id: path.path_id,
            starting_index: path.starting_index,
            symmetric_path_id: path.symmetric_path_id,
        })
    }

    /// Read a rendered path
    ///
    /// # Errors
    ///
    /// Returns `Store` when the state store fails.
    pub fn read_path(&self, path_name: &str) -> Result<Option<RenderedPath>, RenderError> {
        Ok(self.store.get_rendered_path(path_name)?)
    }

    /// Names of all rendered paths
    ///
    /// # Errors
    ///
    /// Returns `Store` when the state store fails.
    pub fn path_names(&self) -> Result<Vec<String>, RenderError> {
        Ok(self.store.rendered_path_names()?)
    }

    /// Delete a rendered path
    ///
    /// Releases the path's exclusivity claims (handing them to a live
    /// mirror), clears the mirror's back-reference, deletes the path, and
    /// frees its id. Returns `false` when no such path exists.
    ///
    /// # Errors
    ///
    /// Returns `Store` when the state store fails.
    pub fn delete_path(&self, path_name: &str) -> Result<bool, RenderError> {
        let _guard = self.commit_lock.lock();
        self.delete_locked(path_name)
    }

    fn delete_locked(&self, path_name: &str) -> Result<bool, RenderError> {
        let Some(path) = self.store.get_rendered_path(path_name)? else {
            return Ok(false);
        };
        let mirror = match &path.symmetric_path {
            Some(name) => self.store.get_rendered_path(name)?,
            None => None,
        };

        let mut undo = DeleteUndo::default();
        if let Err(e) = self.retire(&path, mirror.as_ref(), &mut undo) {
            warn!(path = %path.name, error = %e, "Delete failed, restoring path state");
            self.undo_delete(&path, mirror.as_ref(), undo);
            return Err(e.into());
        }
        self.allocator.free(path.path_id);

        info!(path = %path.name, path_id = path.path_id, "Deleted rendered path");
        Ok(true)
    }

    /// Hand claims over, detach the mirror, then delete; log each change
    fn retire<'a>(
        &self,
        path: &'a RenderedPath,
        mirror: Option<&RenderedPath>,
        undo: &mut DeleteUndo<'a>,
    ) -> Result<(), StoreError> {
        for sf in unique_service_functions(path.service_functions()) {
            if self.store.exclusive_member_of(sf)?.as_deref() != Some(path.name.as_str()) {
                continue;
            }
            self.store.release_exclusive_membership(sf, &path.name)?;
            undo.released.push(sf);
            if let Some(mirror) = mirror {
                self.store.record_exclusive_membership(sf, &mirror.name)?;
                undo.handed_over.push(sf);
                debug!(service_function = %sf, to = %mirror.name, "Exclusive claim handed over");
            }
        }

        if let Some(mirror) = mirror {
            let mut detached = mirror.clone();
            detached.symmetric_path = None;
            detached.symmetric_path_id = None;
            self.store.put_rendered_path(&detached)?;
            undo.mirror_detached = true;
        }

        self.store.delete_rendered_path(&path.name)?;
        Ok(())
    }

    /// Reverse the changes recorded by a failed [`retire`](Self::retire)
    fn undo_delete(&self, path: &RenderedPath, mirror: Option<&RenderedPath>, undo: DeleteUndo<'_>) {
        if let Some(mirror) = mirror {
            if undo.mirror_detached {
                if let Err(e) = self.store.put_rendered_path(mirror) {
                    warn!(path = %mirror.name, error = %e, "Failed to restore mirror back-reference");
                }
            }
            for sf in undo.handed_over {
                if let Err(e) = self.store.release_exclusive_membership(sf, &mirror.name) {
                    warn!(service_function = %sf, error = %e, "Failed to take back handed-over claim");
                }
            }
        }
        for sf in undo.released {
            if let Err(e) = self.store.record_exclusive_membership(sf, &path.name) {
                warn!(service_function = %sf, error = %e, "Failed to restore exclusive claim");
            }
        }
    }

    fn policy_for(&self, request: &PathRequest) -> SelectionPolicy {
        self.policies
            .policy(request.scheduler.unwrap_or(self.default_scheduler))
    }

    fn create_for_chain(
        &self,
        request: &PathRequest,
        chain: &Chain,
        policy: &SelectionPolicy,
    ) -> Result<RenderedPath, RenderError> {
        let prepared = self.prepare(request, chain, policy)?;
        let _guard = self.commit_lock.lock();
        self.insert_locked(request, chain, prepared)
    }

    /// Schedule and resolve hops without holding the commit lock
    fn prepare(
        &self,
        request: &PathRequest,
        chain: &Chain,
        policy: &SelectionPolicy,
    ) -> Result<Prepared, RenderError> {
        if self.store.get_rendered_path(&request.name)?.is_some() {
            return Err(RenderError::AlreadyExists(request.name.clone()));
        }

        let topology = TopologyGraph::from_definitions(self.definitions.as_ref())?;
        let ctx = SelectionContext::new(&topology, self.definitions.as_ref());
        let starting_index = request.starting_index.unwrap_or(self.starting_index);
        let scheduled =
            ChainScheduler::new(policy.clone()).schedule(&ctx, chain, starting_index, request)?;
        let hops = resolve_hops(&topology, scheduled)?;
        let exclusive = self.exclusive_members(&hops);

        Ok(Prepared {
            hops,
            exclusive,
            starting_index,
        })
    }

    fn insert_locked(
        &self,
        request: &PathRequest,
        chain: &Chain,
        prepared: Prepared,
    ) -> Result<RenderedPath, RenderError> {
        let Prepared {
            hops,
            exclusive,
            starting_index,
        } = prepared;

        // Another caller may have taken the name while we were scheduling
        if self.store.get_rendered_path(&request.name)?.is_some() {
            return Err(RenderError::AlreadyExists(request.name.clone()));
        }
        for sf in &exclusive {
            if let Some(holder) = self.store.exclusive_member_of(sf)? {
                info!(
                    path = %request.name,
                    service_function = %sf,
                    holder = %holder,
                    "Exclusivity conflict, path not created"
                );
                return Err(RenderError::ExclusivityConflict {
                    service_function: sf.clone(),
                    path: holder,
                });
            }
        }

        let path_id = match request.path_id {
            Some(id) => self.allocator.check_and_allocate(id)?,
            None => self.allocator.check_and_allocate_next()?,
        };

        let path = RenderedPath {
            name: request.name.clone(),
            path_id,
            chain: chain.name.clone(),
            hops,
            starting_index,
            symmetric_path: None,
            symmetric_path_id: None,
            reverse_path: false,
        };

        if let Err(e) = self.commit(&path, &exclusive) {
            self.allocator.free(path_id);
            return Err(e);
        }

        info!(
            path = %path.name,
            path_id,
            chain = %chain.name,
            hops = path.hops.len(),
            "Created rendered path"
        );
        Ok(path)
    }

    /// Record claims then persist; undo recorded claims on failure
    fn commit(&self, path: &RenderedPath, exclusive: &[String]) -> Result<(), RenderError> {
        let mut recorded: Vec<&str> = Vec::with_capacity(exclusive.len());

        let result = exclusive
            .iter()
            .try_for_each(|sf| {
                self.store.record_exclusive_membership(sf, &path.name)?;
                recorded.push(sf);
                Ok::<(), StoreError>(())
            })
            .and_then(|()| self.store.put_rendered_path(path));

        if let Err(e) = result {
            for sf in recorded {
                if let Err(release) = self.store.release_exclusive_membership(sf, &path.name) {
                    warn!(service_function = %sf, error = %release, "Failed to roll back exclusive claim");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn exclusive_members(&self, hops: &[Hop]) -> Vec<String> {
        unique_service_functions(hops.iter().map(|h| h.service_function.as_str()))
            .into_iter()
            .filter(|sf| {
                self.definitions
                    .read_service_function(sf)
                    .is_some_and(|def| def.one_chain_only)
            })
            .map(String::from)
            .collect()
    }
}

/// Scheduled, resolved hops waiting for the commit critical section
struct Prepared {
    hops: Vec<Hop>,
    exclusive: Vec<String>,
    starting_index: u8,
}

/// Store changes made by a delete so far
#[derive(Default)]
struct DeleteUndo<'a> {
    released: Vec<&'a str>,
    handed_over: Vec<&'a str>,
    mirror_detached: bool,
}

/// Check every scheduled hop against the topology and bind its forwarder
fn resolve_hops(topology: &TopologyGraph, scheduled: Vec<ScheduledHop>) -> Result<Vec<Hop>, RenderError> {
    scheduled
        .into_iter()
        .map(|hop| {
            if !topology.contains_service_function(&hop.service_function) {
                return Err(RenderError::UnknownServiceFunction(hop.service_function));
            }
            let forwarder = match hop.forwarder {
                Some(fwd) if topology.contains_forwarder(&fwd) => fwd,
                Some(fwd) => return Err(RenderError::UnknownForwarder(fwd)),
                None => return Err(RenderError::UnknownServiceFunction(hop.service_function)),
            };
            Ok(Hop {
                position: hop.position,
                service_function: hop.service_function,
                forwarder,
                service_index: hop.service_index,
            })
        })
        .collect()
}

/// Names in first-seen order without duplicates
fn unique_service_functions<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
