//! Concurrency tests
//!
//! Many threads share one builder (and so one allocator, rotation state,
//! and commit lock). These tests check that the shared state stays
//! consistent under contention.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use sfc_renderer::chain::{IdGenerationAlgorithm, PathIdAllocator, RenderError};
use sfc_renderer::model::{PathRequest, ServiceFunction};
use sfc_renderer::selection::SchedulerType;

use super::{harness, harness_with, line_topology};

const THREADS: usize = 8;

#[test]
fn test_concurrent_create_on_exclusive_instance() {
    let mut defs = line_topology();
    defs.add_service_function(ServiceFunction::new("fw1", "firewall", "SFF1").with_exclusive(true));
    let h = harness_with(defs, IdGenerationAlgorithm::Random, SchedulerType::LoadBalance);
    let builder = Arc::new(h.builder);

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || builder.create_path(&PathRequest::new(format!("path-{i}"), "chain-1")))
        })
        .collect();

    let results: Vec<Result<_, RenderError>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(RenderError::ExclusivityConflict { .. })))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, THREADS - 1);

    assert_eq!(h.store.path_count(), 1);
    assert_eq!(h.store.claim_count(), 1);
    assert_eq!(h.allocator.allocated_count(), 1);
}

#[test]
fn test_concurrent_creates_get_unique_ids() {
    const PER_THREAD: usize = 50;

    let h = harness(IdGenerationAlgorithm::Random, SchedulerType::Random);
    let builder = Arc::new(h.builder);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        builder
                            .create_path(&PathRequest::new(format!("path-{t}-{i}"), "chain-1"))
                            .unwrap()
                            .path_id
                    })
                    .collect::<Vec<u32>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(h.allocator.allocated_count(), THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_round_robin_is_fair() {
    const PER_THREAD: usize = 30;

    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);
    let builder = Arc::new(h.builder);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        let path = builder
                            .create_path(&PathRequest::new(format!("path-{t}-{i}"), "chain-1"))
                            .unwrap();
                        path.hops[0].service_function.clone()
                    })
                    .collect::<Vec<String>>()
            })
        })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for handle in handles {
        for name in handle.join().unwrap() {
            *counts.entry(name).or_default() += 1;
        }
    }

    // 240 paths over three firewalls
    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|&n| n == THREADS * PER_THREAD / 3));
}

#[test]
fn test_concurrent_allocator_sequential() {
    const PER_THREAD: usize = 1000;

    let allocator = Arc::new(PathIdAllocator::new(IdGenerationAlgorithm::Sequential));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| allocator.check_and_allocate_next().unwrap())
                    .collect::<Vec<u32>>()
            })
        })
        .collect();

    let mut ids: Vec<u32> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort_unstable();

    // Exactly 1..=8000, no gaps and no repeats
    let total = u32::try_from(THREADS * PER_THREAD).unwrap();
    assert_eq!(ids, (1..=total).collect::<Vec<u32>>());
}

#[test]
fn test_concurrent_render_and_delete() {
    let h = harness(IdGenerationAlgorithm::Random, SchedulerType::RoundRobin);
    let builder = Arc::new(h.builder);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || {
                for i in 0..20 {
                    let name = format!("path-{t}-{i}");
                    builder
                        .render(&PathRequest::new(name.as_str(), "chain-sym"))
                        .unwrap();
                    if i % 2 == 0 {
                        assert!(builder.delete_path(&format!("{name}-Reverse")).unwrap());
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Each thread keeps all 20 originals plus 10 mirrors
    assert_eq!(h.store.path_count(), THREADS * 30);
    assert_eq!(h.allocator.allocated_count(), THREADS * 30);
}

#[test]
fn test_concurrent_sequential_symmetric_render() {
    const PER_THREAD: usize = 200;

    let h = harness(IdGenerationAlgorithm::Sequential, SchedulerType::RoundRobin);
    let builder = Arc::new(h.builder);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let builder = Arc::clone(&builder);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        builder
                            .render(&PathRequest::new(format!("path-{t}-{i}"), "chain-sym"))
                            .map(|paths| {
                                let reverse = paths.reverse.expect("chain-sym is symmetric");
                                (paths.forward.path_id, reverse.path_id)
                            })
                    })
                    .collect::<Vec<Result<(u32, u32), RenderError>>>()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        for result in handle.join().unwrap() {
            let (forward, reverse) = result.unwrap();
            // Pair id is taken straight after the forward id
            assert_eq!(reverse, forward + 1);
            assert_eq!(forward % 2, 1);
            ids.extend([forward, reverse]);
        }
    }
    ids.sort_unstable();

    let total = u32::try_from(THREADS * PER_THREAD * 2).unwrap();
    assert_eq!(ids, (1..=total).collect::<Vec<u32>>());
    assert_eq!(h.store.path_count(), THREADS * PER_THREAD * 2);
    assert_eq!(h.allocator.allocated_count(), THREADS * PER_THREAD * 2);
}
