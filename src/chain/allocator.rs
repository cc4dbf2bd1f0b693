//! Path id allocator
//!
//! This module hands out unique 24-bit path identifiers for rendered
//! paths and derives the paired identifier used by the reverse direction
//! of a symmetric chain.
//!
//! # Identifier Space
//!
//! - Valid range: `0..=0xFF_FFFF` (24-bit service path id)
//! - Bit 23 (`0x80_0000`): direction marker for random-mode symmetric pairs
//!
//! # Generation Algorithms
//!
//! | Algorithm | Next id | Symmetric id |
//! |-----------|---------|--------------|
//! | `Random` | random offset in the lower half, probe forward until free | `id + 0x80_0000` |
//! | `Sequential` | `cursor + 1`, skipping reserved ids | `id + 1` (consumes the slot) |
//!
//! Random mode draws from the lower half only, so every generated id
//! keeps its direction-bit partner inside the identifier space.
//!
//! # Exhaustion
//!
//! The sequential cursor wraps to 0 after the last id and keeps probing.
//! When no free id is left the allocator reports
//! [`PathIdAllocatorError::Exhausted`].
//!
//! # Thread Safety
//!
//! The reservation set, the sequential cursor, the algorithm switch, and
//! the random source share a single mutex, so every operation is
//! serialized against every other.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Smallest valid path id
pub const MIN_PATH_ID: u32 = 0;

/// Largest valid path id (24-bit field)
pub const MAX_PATH_ID: u32 = 0xFF_FFFF;

/// Direction marker added to a random-mode id to form its symmetric pair
pub const SYMMETRIC_DIRECTION_BIT: u32 = 0x80_0000;

/// Id generation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdGenerationAlgorithm {
    /// Random offset with forward probing (DEFAULT)
    #[default]
    Random,
    /// Monotonic cursor
    Sequential,
}

impl IdGenerationAlgorithm {
    /// Parse an algorithm name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "random" => Some(Self::Random),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }
}

impl std::fmt::Display for IdGenerationAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Error types for path id allocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathIdAllocatorError {
    /// No path ids available
    #[error("No available path ids")]
    Exhausted,

    /// Path id already allocated
    #[error("Path id {0} is already allocated")]
    AlreadyAllocated(u32),

    /// Path id out of range
    #[error("Path id {0} is out of valid range (0-16777215)")]
    OutOfRange(u64),
}

impl PathIdAllocatorError {
    /// Conflicts and range errors can be retried with another id
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }
}

struct AllocatorState {
    allocated: HashSet<u32>,
    algorithm: IdGenerationAlgorithm,
    /// Last id handed out in sequential mode
    cursor: u32,
    rng: StdRng,
}

impl AllocatorState {
    fn next_sequential(&mut self) -> Result<u32, PathIdAllocatorError> {
        let space = u64::from(MAX_PATH_ID) + 1;
        let mut candidate = self.cursor;
        for _ in 0..space {
            candidate = if candidate >= MAX_PATH_ID {
                MIN_PATH_ID
            } else {
                candidate + 1
            };
            if self.allocated.insert(candidate) {
                self.cursor = candidate;
                return Ok(candidate);
            }
        }
        Err(PathIdAllocatorError::Exhausted)
    }

    fn next_random(&mut self) -> Result<u32, PathIdAllocatorError> {
        // Probe within [0, SYMMETRIC_DIRECTION_BIT) so the pair id stays in range
        let start = self.rng.gen_range(MIN_PATH_ID..SYMMETRIC_DIRECTION_BIT);
        for step in 0..SYMMETRIC_DIRECTION_BIT {
            let candidate = (start + step) % SYMMETRIC_DIRECTION_BIT;
            if self.allocated.insert(candidate) {
                trace!(start, candidate, "Random path id probe succeeded");
                return Ok(candidate);
            }
        }
        Err(PathIdAllocatorError::Exhausted)
    }
}

/// Path id allocator with conflict detection
///
/// One instance is constructed per process and shared by `Arc` with
/// every path builder.
pub struct PathIdAllocator {
    state: Mutex<AllocatorState>,
}

impl PathIdAllocator {
    /// Create an allocator using `algorithm` and an entropy-seeded source
    ///
    /// # Example
    ///
    /// ```
    /// use sfc_renderer::chain::allocator::{IdGenerationAlgorithm, PathIdAllocator};
    ///
    /// let allocator = PathIdAllocator::new(IdGenerationAlgorithm::Sequential);
    /// assert_eq!(allocator.check_and_allocate_next().unwrap(), 1);
    /// ```
    pub fn new(algorithm: IdGenerationAlgorithm) -> Self {
        Self::with_rng(algorithm, StdRng::from_entropy())
    }

    /// Create an allocator with a deterministic random source
    pub fn with_seed(algorithm: IdGenerationAlgorithm, seed: u64) -> Self {
        Self::with_rng(algorithm, StdRng::seed_from_u64(seed))
    }

    fn with_rng(algorithm: IdGenerationAlgorithm, rng: StdRng) -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                allocated: HashSet::new(),
                algorithm,
                cursor: MIN_PATH_ID,
                rng,
            }),
        }
    }

    /// Switch the generation algorithm
    ///
    /// Only affects [`check_and_allocate_next`](Self::check_and_allocate_next)
    /// and [`check_and_allocate_symmetric`](Self::check_and_allocate_symmetric).
    pub fn set_generation_algorithm(&self, algorithm: IdGenerationAlgorithm) {
        let mut state = self.state.lock();
        if state.algorithm != algorithm {
            debug!(from = %state.algorithm, to = %algorithm, "Path id algorithm changed");
            state.algorithm = algorithm;
        }
    }

    /// Current generation algorithm
    pub fn generation_algorithm(&self) -> IdGenerationAlgorithm {
        self.state.lock().algorithm
    }

    /// Reserve `id` unconditionally
    ///
    /// Returns `true` when `id` is reserved afterwards, including when it
    /// already was. Returns `false` only for ids outside the space.
    pub fn allocate(&self, id: u32) -> bool {
        if id > MAX_PATH_ID {
            return false;
        }
        self.state.lock().allocated.insert(id);
        true
    }

    /// Reserve `id` only if it is free
    ///
    /// # Errors
    ///
    /// - `AlreadyAllocated` - `id` is reserved
    /// - `OutOfRange` - `id` exceeds the 24-bit space
    #[must_use = "The reservation result should be checked for success or failure"]
    pub fn check_and_allocate(&self, id: u32) -> Result<u32, PathIdAllocatorError> {
        if id > MAX_PATH_ID {
            return Err(PathIdAllocatorError::OutOfRange(u64::from(id)));
        }

        let mut state = self.state.lock();
        if !state.allocated.insert(id) {
            return Err(PathIdAllocatorError::AlreadyAllocated(id));
        }
        Ok(id)
    }

    /// Generate and reserve the next id per the configured algorithm
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` if no id can be generated.
    #[must_use = "The allocated path id must be stored and later freed"]
    pub fn check_and_allocate_next(&self) -> Result<u32, PathIdAllocatorError> {
        let mut state = self.state.lock();
        let result = match state.algorithm {
            IdGenerationAlgorithm::Random => state.next_random(),
            IdGenerationAlgorithm::Sequential => state.next_sequential(),
        };
        if result.is_err() {
            warn!(
                algorithm = %state.algorithm,
                allocated = state.allocated.len(),
                "Path id space exhausted"
            );
        }
        result
    }

    /// Reserve the id paired with `id` for the reverse direction
    ///
    /// Sequential mode pairs `id` with `id + 1` and moves the cursor past
    /// it. Random mode pairs `id` with `id + 0x80_0000`.
    ///
    /// # Errors
    ///
    /// - `AlreadyAllocated` - the paired id is reserved
    /// - `OutOfRange` - the paired id leaves the 24-bit space
    #[must_use = "The allocated path id must be stored and later freed"]
    pub fn check_and_allocate_symmetric(&self, id: u32) -> Result<u32, PathIdAllocatorError> {
        let mut state = self.state.lock();
        let offset = match state.algorithm {
            IdGenerationAlgorithm::Sequential => 1,
            IdGenerationAlgorithm::Random => u64::from(SYMMETRIC_DIRECTION_BIT),
        };
        let paired = u64::from(id) + offset;
        let paired = u32::try_from(paired)
            .ok()
            .filter(|p| *p <= MAX_PATH_ID)
            .ok_or(PathIdAllocatorError::OutOfRange(paired))?;

        if !state.allocated.insert(paired) {
            return Err(PathIdAllocatorError::AlreadyAllocated(paired));
        }
        if state.algorithm == IdGenerationAlgorithm::Sequential && paired > state.cursor {
            state.cursor = paired;
        }
        Ok(paired)
    }

    /// Whether `id` is not reserved
    pub fn is_free(&self, id: u32) -> bool {
        !self.state.lock().allocated.contains(&id)
    }

    /// Release `id`, returning whether it had been reserved
    pub fn free(&self, id: u32) -> bool {
        self.state.lock().allocated.remove(&id)
    }

    /// Number of reserved ids
    pub fn allocated_count(&self) -> usize {
        self.state.lock().allocated.len()
    }

    /// All reserved ids, sorted
    pub fn allocated_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.state.lock().allocated.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for PathIdAllocator {
    fn default() -> Self {
        Self::new(IdGenerationAlgorithm::default())
    }
}
