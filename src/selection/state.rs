//! Shared, process-wide selection state
//!
//! Round-robin cursors and the random source outlive a single
//! scheduling call. Both are owned components shared by `Arc`; neither
//! is a static.

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::ServiceFunctionType;

/// Per-type round-robin cursors
#[derive(Debug, Default)]
pub struct RotationState {
    cursors: DashMap<ServiceFunctionType, usize>,
}

impl RotationState {
    /// Create with every cursor at the start of its list
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cursor for `sf_type` and move it one step forward
    ///
    /// `len` is the current number of instances of the type; the cursor
    /// wraps at the end of the list. `len` must be non-zero.
    pub fn advance(&self, sf_type: &ServiceFunctionType, len: usize) -> usize {
        debug_assert!(len > 0, "rotation over an empty list");
        let mut cursor = self.cursors.entry(sf_type.clone()).or_insert(0);
        let index = *cursor % len;
        *cursor = (index + 1) % len;
        index
    }

    /// Index the next `advance` for `sf_type` will start from
    pub fn peek(&self, sf_type: &ServiceFunctionType) -> usize {
        self.cursors.get(sf_type).map_or(0, |c| *c)
    }

    /// Reset every cursor
    pub fn reset(&self) {
        self.cursors.clear();
    }
}

/// Seedable uniform random source
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    /// Entropy-seeded source
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic source
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform index in `0..len`; `len` must be non-zero
    pub fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}
