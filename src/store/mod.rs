//! External collaborator interfaces
//!
//! The renderer reads definitions and writes rendered path state through
//! two narrow traits. Production deployments back them with a
//! transactional configuration/operational store; this crate ships
//! in-memory implementations used by the CLI and the tests.
//!
//! # Submodules
//!
//! - [`memory`]: `MemoryDefinitions` and `MemoryStateStore`

pub mod memory;

use crate::model::{Chain, Forwarder, RenderedPath, ServiceFunction, ServiceFunctionType};

pub use memory::{MemoryDefinitions, MemoryStateStore};

/// Error types for the external state store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store cannot be reached or refused the transaction
    #[error("State store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to chain, forwarder, and service function definitions
///
/// Implementations are assumed consistent for the duration of one
/// scheduling call.
pub trait DefinitionReader: Send + Sync {
    /// Read a chain by name
    fn read_chain(&self, name: &str) -> Option<Chain>;

    /// Read a forwarder by name
    fn read_forwarder(&self, name: &str) -> Option<Forwarder>;

    /// Read a service function by name
    fn read_service_function(&self, name: &str) -> Option<ServiceFunction>;

    /// All service functions of a type
    fn service_functions_of_type(&self, sf_type: &ServiceFunctionType) -> Vec<ServiceFunction>;

    /// Latest reported CPU load of a service function
    fn load_metric_of(&self, name: &str) -> Option<u32>;

    /// All forwarders
    fn forwarders(&self) -> Vec<Forwarder>;

    /// All service functions
    fn service_functions(&self) -> Vec<ServiceFunction>;
}

/// Rendered path state and exclusivity claims
///
/// Every call is one atomic unit of work on the store side.
pub trait StateStore: Send + Sync {
    /// Active path that holds an exclusive claim on `service_function`
    fn exclusive_member_of(&self, service_function: &str) -> Result<Option<String>, StoreError>;

    /// Record that `path` holds the exclusive claim on `service_function`
    fn record_exclusive_membership(
        &self,
        service_function: &str,
        path: &str,
    ) -> Result<(), StoreError>;

    /// Drop the claim of `path` on `service_function`, if it holds it
    fn release_exclusive_membership(
        &self,
        service_function: &str,
        path: &str,
    ) -> Result<(), StoreError>;

    /// Insert or replace a rendered path
    fn put_rendered_path(&self, path: &RenderedPath) -> Result<(), StoreError>;

    /// Read a rendered path by name
    fn get_rendered_path(&self, name: &str) -> Result<Option<RenderedPath>, StoreError>;

    /// Delete a rendered path, returning whether it existed
    fn delete_rendered_path(&self, name: &str) -> Result<bool, StoreError>;

    /// Names of all rendered paths
    fn rendered_path_names(&self) -> Result<Vec<String>, StoreError>;
}
