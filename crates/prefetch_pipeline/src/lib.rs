//! Bounded multi-worker prefetch pipeline for training loops.
//!
//! Producer workers pull batches from a [`source::BatchSource`] and publish
//! them into per-slot bounded channels; a [`pipeline::Coordinator`] drains
//! the slots round-robin, feeds a [`consumer::Consumer`], and periodically
//! replaces workers. See [`pipeline`] for the architecture overview.

pub mod batch;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod source;

pub use batch::Batch;
pub use consumer::{Consumer, StepMetrics};
pub use error::PipelineError;
pub use pipeline::{Coordinator, CycleReport, PipelineConfig, WorkerPool};
pub use source::{BatchSource, BatchStream, Role};
