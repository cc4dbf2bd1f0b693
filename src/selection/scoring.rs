//! Scoring function for load-and-path-aware selection
//!
//! The default combines the two inputs linearly:
//!
//! ```text
//! score = path_weight * path_cost + load_weight * load
//! ```
//!
//! where `path_cost` is the weighted forwarder distance from the previous
//! hop and `load` is the reported CPU percentage (missing metrics count
//! as fully loaded). Lower scores win.

use std::fmt;
use std::sync::Arc;

type ScoreFn = dyn Fn(u64, u32) -> f64 + Send + Sync;

/// Pluggable `(path_cost, load) -> score` function
#[derive(Clone)]
pub struct LoadPathScorer {
    score: Arc<ScoreFn>,
    label: String,
}

impl LoadPathScorer {
    /// Linear combination of path cost and load
    #[allow(clippy::cast_precision_loss)]
    pub fn linear(path_weight: f64, load_weight: f64) -> Self {
        Self {
            score: Arc::new(move |cost, load| {
                path_weight * cost as f64 + load_weight * f64::from(load)
            }),
            label: format!("linear(path={path_weight}, load={load_weight})"),
        }
    }

    /// Arbitrary scoring function
    pub fn custom<F>(label: impl Into<String>, score: F) -> Self
    where
        F: Fn(u64, u32) -> f64 + Send + Sync + 'static,
    {
        Self {
            score: Arc::new(score),
            label: label.into(),
        }
    }

    /// Score a candidate
    pub fn score(&self, path_cost: u64, load: u32) -> f64 {
        (self.score)(path_cost, load)
    }

    /// Human-readable description
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for LoadPathScorer {
    fn default() -> Self {
        Self::linear(1.0, 1.0)
    }
}

impl fmt::Debug for LoadPathScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadPathScorer")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
