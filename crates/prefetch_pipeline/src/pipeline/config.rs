//! src/pipeline/config.rs
//!
//! Configuration for pipeline behaviour.
//!
//! `PipelineConfig` stores the plain scalars that control how many workers
//! run, how much each produces, and how the coordinator paces a run.
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder()
//!     .worker_count(2)
//!     .train_quota(4)
//!     .validation_quota(2)
//!     .cycle_count(3)
//!     .channel_capacity(8)
//!     .build();
//! ```
//!
//! # Performance considerations:
//! - `worker_count`: more workers smooth over slow sources but use more memory
//! - `channel_capacity`: a larger bound buffers more items ahead of the
//!   consumer; a smaller one applies backpressure sooner
//! - `poll_interval`: how quickly workers notice retirement and the
//!   coordinator re-checks a quiet channel

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the prefetch pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of producer workers, one per slot (must be > 0)
    pub worker_count: usize,
    /// Train items each worker produces per generation; also the number of
    /// train items the coordinator drains per cycle (must be > 0)
    pub train_quota: usize,
    /// Validation items each worker produces per generation; also the number
    /// drained per cycle (0 disables validation)
    pub validation_quota: usize,
    /// Number of cycles the coordinator runs before shutting the pool down
    pub cycle_count: usize,
    /// Bound of each slot's channel; a worker pushing past it blocks (must be > 0)
    pub channel_capacity: usize,
    /// Maximum total time the coordinator waits for one item from a slot.
    /// If exceeded, the cycle fails with `ChannelStarvation`. Default: 30s
    pub drain_timeout: Duration,
    /// How often a blocked worker checks for retirement, and the step in
    /// which the coordinator waits on a quiet channel. Not an error timeout.
    /// Must be non-zero.
    /// Default: 100ms
    pub poll_interval: Duration,
    /// Where the consumer persists trained state after the final cycle.
    /// `None` skips persistence.
    pub persist_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            train_quota: 1,
            validation_quota: 1,
            cycle_count: 1,
            channel_capacity: 8,
            drain_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            persist_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig with method chaining.
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of worker slots (must be > 0)
    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Set the per-generation train quota (must be > 0)
    pub fn train_quota(mut self, quota: usize) -> Self {
        self.config.train_quota = quota;
        self
    }

    /// Set the per-generation validation quota (0 disables validation)
    pub fn validation_quota(mut self, quota: usize) -> Self {
        self.config.validation_quota = quota;
        self
    }

    /// Set how many cycles the coordinator runs
    pub fn cycle_count(mut self, cycles: usize) -> Self {
        self.config.cycle_count = cycles;
        self
    }

    /// Set the per-slot channel bound (must be > 0)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the starvation timeout for draining one item.
    ///
    /// - Too low: may fail cycles during legitimately slow production
    /// - Too high: delays detection of a dead or stuck worker
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.drain_timeout = timeout;
        self
    }

    /// Set the polling interval for retirement checks and quiet channels.
    ///
    /// - Too low: more responsive retirement, higher CPU usage
    /// - Too high: less overhead, slower retirement response
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set where trained state is persisted after the final cycle.
    pub fn persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.persist_path = Some(path.into());
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
