//! src/error.rs
//!
//! Typed pipeline failures.
//!
//! Most errors in this crate travel as `anyhow::Error` with call-site context,
//! but the three pipeline-level failure classes below are worth matching on:
//! callers decide whether a run is salvageable based on which one occurred.
//! They are embedded in `anyhow` chains and can be recovered with
//! `err.downcast_ref::<PipelineError>()`.

use crate::source::Role;
use std::time::Duration;
use thiserror::Error;

/// Pipeline-level failure classes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A batch source cannot produce items, typically because the backing
    /// data location is missing or empty. Raised when opening a role stream;
    /// a worker that hits this mid-run forwards it through its channel and
    /// exits rather than hanging.
    #[error("batch source unavailable for {role:?}: {reason}")]
    SourceUnavailable { role: Role, reason: String },

    /// The coordinator waited `waited` for an item from `slot` without one
    /// arriving. Either the bound worker died before filling its quota or it
    /// is stuck; in both cases the run cannot make progress.
    #[error("channel starvation on slot {slot} ({role:?}): no item after {waited:?}")]
    ChannelStarvation {
        slot: usize,
        role: Role,
        waited: Duration,
    },

    /// A replacement worker could not be launched for `slot`. Fatal for the
    /// slot: the coordinator must not keep draining a slot with no live
    /// producer.
    #[error("failed to launch worker for slot {slot}")]
    WorkerLaunchFailure { slot: usize },
}
