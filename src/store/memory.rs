//! In-memory collaborators
//!
//! `MemoryDefinitions` serves a fixed definition snapshot (usually the
//! `topology` section of the config file) with mutable load metrics.
//! `MemoryStateStore` keeps rendered paths and exclusivity claims in
//! maps and can be switched into an unavailable mode to exercise the
//! hard-error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::{DefinitionReader, StateStore, StoreError};
use crate::config::TopologyConfig;
use crate::model::{Chain, Forwarder, RenderedPath, ServiceFunction, ServiceFunctionType};

/// Definition snapshot held in memory
#[derive(Debug, Default)]
pub struct MemoryDefinitions {
    chains: BTreeMap<String, Chain>,
    forwarders: BTreeMap<String, Forwarder>,
    service_functions: BTreeMap<String, ServiceFunction>,
    loads: RwLock<HashMap<String, u32>>,
}

impl MemoryDefinitions {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the topology section of the configuration
    pub fn from_config(config: &TopologyConfig) -> Self {
        let mut definitions = Self::new();
        for fwd in &config.forwarders {
            definitions.add_forwarder(fwd.clone());
        }
        for sf in &config.service_functions {
            definitions.add_service_function(sf.clone());
        }
        for chain in &config.chains {
            definitions.add_chain(chain.clone());
        }
        definitions
    }

    /// Add or replace a chain
    pub fn add_chain(&mut self, chain: Chain) {
        self.chains.insert(chain.name.clone(), chain);
    }

    /// Add or replace a forwarder
    pub fn add_forwarder(&mut self, forwarder: Forwarder) {
        self.forwarders.insert(forwarder.name.clone(), forwarder);
    }

    /// Add or replace a service function; its configured load seeds the metric
    pub fn add_service_function(&mut self, sf: ServiceFunction) {
        if let Some(load) = sf.load {
            self.loads.write().insert(sf.name.clone(), load);
        }
        self.service_functions.insert(sf.name.clone(), sf);
    }

    /// Update the reported load of a service function
    pub fn set_load_metric(&self, name: &str, load: u32) {
        self.loads.write().insert(name.to_string(), load);
    }

    /// Forget the reported load of a service function
    pub fn clear_load_metric(&self, name: &str) {
        self.loads.write().remove(name);
    }
}

impl DefinitionReader for MemoryDefinitions {
    fn read_chain(&self, name: &str) -> Option<Chain> {
        self.chains.get(name).cloned()
    }

    fn read_forwarder(&self, name: &str) -> Option<Forwarder> {
        self.forwarders.get(name).cloned()
    }

    fn read_service_function(&self, name: &str) -> Option<ServiceFunction> {
        self.service_functions.get(name).map(|sf| {
            let mut sf = sf.clone();
            sf.load = self.load_metric_of(name);
            sf
        })
    }

    fn service_functions_of_type(&self, sf_type: &ServiceFunctionType) -> Vec<ServiceFunction> {
        self.service_functions
            .values()
            .filter(|sf| &sf.sf_type == sf_type)
            .cloned()
            .collect()
    }

    fn load_metric_of(&self, name: &str) -> Option<u32> {
        self.loads.read().get(name).copied()
    }

    fn forwarders(&self) -> Vec<Forwarder> {
        self.forwarders.values().cloned().collect()
    }

    fn service_functions(&self) -> Vec<ServiceFunction> {
        self.service_functions.values().cloned().collect()
    }
}

/// Rendered path state held in memory
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    paths: RwLock<BTreeMap<String, RenderedPath>>,
    /// Service function -> path holding its exclusive claim
    claims: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored paths
    pub fn path_count(&self) -> usize {
        self.paths.read().len()
    }

    /// Number of held exclusivity claims
    pub fn claim_count(&self) -> usize {
        self.claims.read().len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".into()));
        }
        Ok(())
    }
}

impl StateStore for MemoryStateStore {
    fn exclusive_member_of(&self, service_function: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        Ok(self.claims.read().get(service_function).cloned())
    }

    fn record_exclusive_membership(
        &self,
        service_function: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.claims
            .write()
            .insert(service_function.to_string(), path.to_string());
        Ok(())
    }

    fn release_exclusive_membership(
        &self,
        service_function: &str,
        path: &str,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut claims = self.claims.write();
        if claims.get(service_function).is_some_and(|holder| holder == path) {
            claims.remove(service_function);
        }
        Ok(())
    }

    fn put_rendered_path(&self, path: &RenderedPath) -> Result<(), StoreError> {
        self.check_available()?;
        self.paths.write().insert(path.name.clone(), path.clone());
        Ok(())
    }

    fn get_rendered_path(&self, name: &str) -> Result<Option<RenderedPath>, StoreError> {
        self.check_available()?;
        Ok(self.paths.read().get(name).cloned())
    }

    fn delete_rendered_path(&self, name: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.paths.write().remove(name).is_some())
    }

    fn rendered_path_names(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        Ok(self.paths.read().keys().cloned().collect())
    }
}
