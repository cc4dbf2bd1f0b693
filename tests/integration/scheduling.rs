//! Scheduling tests across whole chains
//!
//! # Test Categories
//!
//! 1. **Round Robin Tests**: fairness and the rotation reset hook
//! 2. **Pinning Tests**: pinned hops under every policy
//! 3. **Graph Policy Tests**: shortest, weighted, and load-path-aware
//!    selection on small hand-built topologies

use sfc_renderer::chain::{IdGenerationAlgorithm, RenderError, ScheduleError};
use sfc_renderer::model::{Chain, Forwarder, HopOverride, PathRequest, ServiceFunction};
use sfc_renderer::selection::{LoadPathScorer, PolicySet, SchedulerType, SelectionError};
use sfc_renderer::store::MemoryDefinitions;

use super::{harness, harness_with, line_topology};

// ============================================================================
// Round Robin Tests
// ============================================================================

#[test]
fn test_round_robin_fairness() {
    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);

    let expected = [
        ["fw1", "dpi1", "nat1"],
        ["fw2", "dpi2", "nat2"],
        ["fw3", "dpi3", "nat3"],
        ["fw1", "dpi1", "nat1"],
    ];
    for (i, want) in expected.iter().enumerate() {
        let path = h
            .builder
            .create_path(&PathRequest::new(format!("path-{i}"), "chain-1"))
            .unwrap();
        assert_eq!(path.service_functions().collect::<Vec<_>>(), want.to_vec());
    }
}

#[test]
fn test_round_robin_reset() {
    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);
    h.builder
        .create_path(&PathRequest::new("path-a", "chain-1"))
        .unwrap();
    h.builder.policies().rotation().reset();

    let path = h
        .builder
        .create_path(&PathRequest::new("path-b", "chain-1"))
        .unwrap();
    assert_eq!(path.hops[0].service_function, "fw1");
}

#[test]
fn test_failed_schedule_still_rotates_earlier_positions() {
    let mut defs = line_topology();
    defs.add_chain(Chain::from_types("broken", ["firewall", "ids"]));
    let h = harness_with(defs, IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);

    assert!(matches!(
        h.builder.create_path(&PathRequest::new("path-x", "broken")),
        Err(RenderError::Schedule(ScheduleError::Unschedulable { position: 1, .. }))
    ));
    assert_eq!(h.allocator.allocated_count(), 0);

    let path = h
        .builder
        .create_path(&PathRequest::new("path-y", "chain-1"))
        .unwrap();
    assert_eq!(path.hops[0].service_function, "fw2");
}

// ============================================================================
// Pinning Tests
// ============================================================================

#[test]
fn test_pinned_hop_under_every_policy() {
    let mut defs = line_topology();
    defs.add_service_function(ServiceFunction::new("hop-dpi", "dpi", "SFF2"));
    let h = harness_with(defs, IdGenerationAlgorithm::Random, SchedulerType::RoundRobin);

    for kind in SchedulerType::ALL {
        let request = PathRequest::new(format!("pinned-{kind}"), "chain-1")
            .with_hop(HopOverride::new(1, "hop-dpi").on_forwarder("SFF2"))
            .with_scheduler(kind);
        let path = h.builder.create_path(&request).unwrap();

        assert_eq!(path.hops.len(), 3, "policy {kind}");
        assert!(path.hops[0].service_function.starts_with("fw"), "policy {kind}");
        assert_eq!(path.hops[1].service_function, "hop-dpi", "policy {kind}");
        assert_eq!(path.hops[1].forwarder, "SFF2", "policy {kind}");
        assert!(path.hops[2].service_function.starts_with("nat"), "policy {kind}");
    }
}

#[test]
fn test_pin_to_missing_instance_rejected() {
    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);
    let request = PathRequest::new("path-1", "chain-1")
        .with_hop(HopOverride::new(1, "hop-dpi").on_forwarder("SFF2"));

    assert!(matches!(
        h.builder.create_path(&request),
        Err(RenderError::UnknownServiceFunction(ref name)) if name == "hop-dpi"
    ));
    assert_eq!(h.store.path_count(), 0);
}

#[test]
fn test_shortest_path_follows_pinned_start() {
    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::ShortestPath);
    let request = PathRequest::new("path-1", "chain-1").with_hop(HopOverride::new(0, "fw3"));

    let path = h.builder.create_path(&request).unwrap();
    assert_eq!(
        path.service_functions().collect::<Vec<_>>(),
        vec!["fw3", "dpi3", "nat3"]
    );
}

// ============================================================================
// Graph Policy Tests
// ============================================================================

/// `A -(10)- B`, `A -(1)- C`, and an isolated `D`
///
/// `fwA` on A; `dpiB` (load 0) on B; `dpiC` (load 50) on C; `natD` on D;
/// `fwC` on C.
fn weighted_topology() -> MemoryDefinitions {
    let mut defs = MemoryDefinitions::new();
    defs.add_forwarder(
        Forwarder::new("A")
            .with_weighted_link("B", 10)
            .with_weighted_link("C", 1),
    );
    defs.add_forwarder(Forwarder::new("B"));
    defs.add_forwarder(Forwarder::new("C"));
    defs.add_forwarder(Forwarder::new("D"));
    defs.add_service_function(ServiceFunction::new("fwA", "firewall", "A"));
    defs.add_service_function(ServiceFunction::new("fwC", "firewall", "C"));
    defs.add_service_function(ServiceFunction::new("dpiB", "dpi", "B").with_load(0));
    defs.add_service_function(ServiceFunction::new("dpiC", "dpi", "C").with_load(50));
    defs.add_service_function(ServiceFunction::new("natD", "nat", "D"));
    defs.add_chain(Chain::from_types("fw-dpi", ["firewall", "dpi"]));
    defs.add_chain(Chain::from_types("fw-nat", ["firewall", "nat"]));
    defs
}

fn from_fw_a(name: &str, chain: &str) -> PathRequest {
    PathRequest::new(name, chain).with_hop(HopOverride::new(0, "fwA"))
}

#[test]
fn test_hop_count_ties_break_by_enumeration_order() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::ShortestPath,
    );
    let path = h.builder.create_path(&from_fw_a("p", "fw-dpi")).unwrap();
    assert_eq!(path.hops[1].service_function, "dpiB");
}

#[test]
fn test_weighted_shortest_path_prefers_light_link() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::WeightedShortestPath,
    );
    let path = h.builder.create_path(&from_fw_a("p", "fw-dpi")).unwrap();
    assert_eq!(path.hops[1].service_function, "dpiC");
    assert_eq!(path.hops[1].forwarder, "C");
}

#[test]
fn test_load_path_aware_default_weights() {
    // dpiB: 10 + 0, dpiC: 1 + 50
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::LoadPathAware,
    );
    let path = h.builder.create_path(&from_fw_a("p", "fw-dpi")).unwrap();
    assert_eq!(path.hops[1].service_function, "dpiB");
}

#[test]
fn test_load_path_aware_custom_scorer() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::LoadPathAware,
    );
    let builder = h
        .builder
        .with_policies(PolicySet::new().with_scorer(LoadPathScorer::linear(10.0, 0.1)));

    // dpiB: 100 + 0, dpiC: 10 + 5
    let path = builder.create_path(&from_fw_a("p", "fw-dpi")).unwrap();
    assert_eq!(path.hops[1].service_function, "dpiC");
}

#[test]
fn test_home_forwarder_anchors_first_position() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::ShortestPath,
    );
    let builder = h
        .builder
        .with_policies(PolicySet::new().with_home_forwarder(Some("C".into())));

    let path = builder
        .create_path(&PathRequest::new("p", "fw-dpi"))
        .unwrap();
    assert_eq!(path.hops[0].service_function, "fwC");
    assert_eq!(path.hops[1].service_function, "dpiC");
}

#[test]
fn test_unreachable_type_fails_chain() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::ShortestPath,
    );

    let err = h
        .builder
        .create_path(&from_fw_a("p", "fw-nat"))
        .unwrap_err();
    match err {
        RenderError::Schedule(ScheduleError::Unschedulable {
            position, source, ..
        }) => {
            assert_eq!(position, 1);
            assert!(matches!(source, SelectionError::Unreachable { ref from, .. } if from == "A"));
        }
        other => panic!("Unexpected error: {other}"),
    }
    assert_eq!(h.store.path_count(), 0);
    assert_eq!(h.allocator.allocated_count(), 0);
}

#[test]
fn test_load_balance_ignores_topology() {
    let h = harness_with(
        weighted_topology(),
        IdGenerationAlgorithm::Sequential,
        SchedulerType::LoadBalance,
    );
    let path = h.builder.create_path(&from_fw_a("p", "fw-nat")).unwrap();
    assert_eq!(path.hops[1].service_function, "natD");
}
