//! src/pipeline/mod.rs
//!
//! The bounded multi-worker prefetch pipeline.
//!
//! A fixed-size pool of producer workers continuously generates work items
//! and publishes them into per-slot bounded channels; a single coordinator
//! loop drains the slots in round-robin order, feeds each item to a consumer,
//! and replaces the just-drained slot's worker to force fresh production.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌─────────────┐     ┌─────────────┐          ┌─────────────┐
//!   │ BatchSource │     │ BatchSource │   ...    │ BatchSource │
//!   └──────┬──────┘     └──────┬──────┘          └──────┬──────┘
//!          │ streams           │                        │
//!          ↓                   ↓                        ↓
//!    ┌──────────┐        ┌──────────┐            ┌──────────┐
//!    │ Worker 0 │        │ Worker 1 │    ...     │ Worker N │   (threads)
//!    └────┬─────┘        └────┬─────┘            └────┬─────┘
//!         │ push (bounded)    │                       │
//!         ↓                   ↓                       ↓
//!    [ channel 0 ]       [ channel 1 ]           [ channel N ]  (slots)
//!         └───────────────────┼───────────────────────┘
//!                             │ round-robin drain
//!                             ↓
//!                     ┌───────────────┐
//!                     │  Coordinator  │ ←──── PipelineConfig
//!                     └───────┬───────┘
//!                             │ one item at a time
//!                             ↓
//!                      ┌────────────┐
//!                      │  Consumer  │ (external model)
//!                      └────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/pipeline/
//! ├── mod.rs             # Public API exports + architecture docs
//! ├── config.rs          # PipelineConfig and builder
//! ├── worker.rs          # Producer loop: per-role quotas, backpressured push
//! ├── pool.rs            # WorkerPool: slot table, start/retire/restart/shutdown
//! └── coordinator.rs     # Cycle loop, starvation handling, CycleReport
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let source = Arc::new(SyntheticSource::new(150 * 150 * 3, 16, 42));
//! let config = PipelineConfig::builder()
//!     .worker_count(2)
//!     .train_quota(312)
//!     .validation_quota(312)
//!     .cycle_count(100)
//!     .build();
//!
//! let pool = WorkerPool::start(source, &config)?;
//! let reports = Coordinator::new(pool, model, config)?.run()?;
//! ```
//!
//! # Semantics worth knowing
//! - Retiring a worker abandons whatever it had not yet pushed; items already
//!   queued in the slot's channel stay available to future draws. There is no
//!   exactly-once guarantee across worker replacement.
//! - Within one slot, items arrive in production order (FIFO). Across slots
//!   there is no ordering relation; the round-robin schedule alone decides
//!   which slot a cycle drains.
//! - After the final cycle the coordinator shuts down every remaining worker
//!   and joins it; nothing outlives the run.

// Module declarations
mod config;
mod coordinator;
mod pool;
mod worker;

// Public re-exports
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use coordinator::{Coordinator, CycleReport};
pub use pool::WorkerPool;
