//! Integration tests for sfc-renderer
//!
//! This module exercises the renderer end to end through its public API,
//! with in-memory collaborators standing in for the external stores.
//!
//! # Test Organization
//!
//! - `render_path`: path creation, exclusivity, symmetric mirrors, first hops
//! - `scheduling`: selection policies and pinned hops across whole chains
//! - `concurrency`: concurrent creation and id allocation from many threads
//! - `config_render`: configuration file to rendered paths

pub mod concurrency;
pub mod config_render;
pub mod scheduling;

use std::sync::Arc;

use sfc_renderer::chain::{IdGenerationAlgorithm, PathIdAllocator, RenderedPathBuilder};
use sfc_renderer::model::{Chain, DataPlaneLocator, Forwarder, ServiceFunction};
use sfc_renderer::selection::SchedulerType;
use sfc_renderer::store::{MemoryDefinitions, MemoryStateStore};

/// Shared handles for one test scenario
pub struct Harness {
    pub builder: RenderedPathBuilder,
    pub store: Arc<MemoryStateStore>,
    pub allocator: Arc<PathIdAllocator>,
    pub definitions: Arc<MemoryDefinitions>,
}

/// Line topology `SFF1 - SFF2 - SFF3`, one firewall, DPI, and NAT
/// instance per forwarder (`fw1`/`dpi1`/`nat1` on `SFF1`, and so on).
///
/// Every forwarder has a locator `10.0.0.<n>:6633`. Chains:
/// - `chain-1`: firewall, dpi, nat
/// - `chain-sym`: firewall, dpi (symmetric)
pub fn line_topology() -> MemoryDefinitions {
    let mut defs = MemoryDefinitions::new();
    for n in 1..=3u8 {
        let mut fwd = Forwarder::new(format!("SFF{n}"))
            .with_locator(DataPlaneLocator::new([10, 0, 0, n].into(), 6633));
        if n < 3 {
            fwd = fwd.with_link(format!("SFF{}", n + 1));
        }
        defs.add_forwarder(fwd);

        for (prefix, sf_type) in [("fw", "firewall"), ("dpi", "dpi"), ("nat", "nat")] {
            defs.add_service_function(ServiceFunction::new(
                format!("{prefix}{n}"),
                sf_type,
                format!("SFF{n}"),
            ));
        }
    }
    defs.add_chain(Chain::from_types("chain-1", ["firewall", "dpi", "nat"]));
    defs.add_chain(Chain::from_types("chain-sym", ["firewall", "dpi"]).with_symmetric(true));
    defs
}

/// Builder over `definitions` with a fresh store and seeded allocator
pub fn harness_with(
    definitions: MemoryDefinitions,
    algorithm: IdGenerationAlgorithm,
    scheduler: SchedulerType,
) -> Harness {
    let definitions = Arc::new(definitions);
    let store = Arc::new(MemoryStateStore::new());
    let allocator = Arc::new(PathIdAllocator::with_seed(algorithm, 42));
    let builder = RenderedPathBuilder::new(definitions.clone(), store.clone(), allocator.clone())
        .with_default_scheduler(scheduler);
    Harness {
        builder,
        store,
        allocator,
        definitions,
    }
}

/// Builder over [`line_topology`]
pub fn harness(algorithm: IdGenerationAlgorithm, scheduler: SchedulerType) -> Harness {
    harness_with(line_topology(), algorithm, scheduler)
}
