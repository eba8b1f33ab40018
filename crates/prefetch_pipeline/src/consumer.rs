//! src/consumer.rs
//!
//! The consuming side of the pipeline: the model boundary.
//!
//! The pipeline treats the model as a black box that accepts one work item at
//! a time and returns scalar metrics. Only the coordinator thread ever calls
//! into a `Consumer`, so implementations need no internal synchronization.

use anyhow::Result;
use std::path::Path;

/// Scalar result of one training step or one aggregate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    pub loss: f64,
    pub accuracy: f64,
}

impl StepMetrics {
    pub fn new(loss: f64, accuracy: f64) -> Self {
        Self { loss, accuracy }
    }
}

/// The external model boundary.
///
/// An implementation might wrap a real training framework; the tests in this
/// crate use recording stubs. A `train_step` or `evaluate` failure (e.g. a
/// malformed item) aborts the current cycle; it does not take down the whole
/// run unless the caller chooses to stop.
pub trait Consumer<T> {
    /// Runs one training step on a single item and returns its metrics.
    fn train_step(&mut self, item: &T) -> Result<StepMetrics>;

    /// Evaluates a drained sequence of validation items, returning the
    /// aggregate metrics over all of them.
    fn evaluate(&mut self, items: &[T]) -> Result<StepMetrics>;

    /// Saves trained state at the end of a run. Fire-and-forget: no contract
    /// beyond success or failure.
    fn persist(&mut self, path: &Path) -> Result<()>;
}
