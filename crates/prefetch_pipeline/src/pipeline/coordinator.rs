//! src/pipeline/coordinator.rs
//!
//! The consuming loop: drains slots round-robin and owns worker lifecycle.
//!
//! Each cycle selects one slot by `cycle_index % worker_count`, drains that
//! slot's train items into the consumer's train step, drains its validation
//! items into one aggregate evaluation, retires the slot's worker, launches a
//! replacement, and reports the cycle's metrics. Train draws always precede
//! validation draws, matching the production order on the worker side.
//!
//! Draining blocks until an item is available, in `poll_interval` steps up to
//! `drain_timeout` total. A slot whose worker died with an empty channel, or
//! that stays quiet past the timeout, fails the cycle with
//! [`PipelineError::ChannelStarvation`] instead of waiting forever.

use crate::consumer::{Consumer, StepMetrics};
use crate::error::PipelineError;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::pool::WorkerPool;
use crate::source::Role;
use anyhow::{anyhow, Context, Result};
use std::time::{Duration, Instant};
use tracing::info;

/// Structured result of one completed cycle.
///
/// Train metrics are averaged over the cycle's train draws; validation
/// metrics are the consumer's aggregate over the drained validation items.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: usize,
    pub slot: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub validation_loss: f64,
    pub validation_accuracy: f64,
    pub elapsed: Duration,
}

/// Drives a [`WorkerPool`] through a fixed number of cycles, feeding drained
/// items to a [`Consumer`].
pub struct Coordinator<T, C>
where
    T: Send + 'static,
    C: Consumer<T>,
{
    pool: WorkerPool<T>,
    consumer: C,
    config: PipelineConfig,
    cycle_index: usize,
}

impl<T, C> Coordinator<T, C>
where
    T: Send + 'static,
    C: Consumer<T>,
{
    /// Wraps a started pool and a consumer.
    ///
    /// # Errors
    /// - Returns error if `train_quota` is 0
    /// - Returns error if `cycle_count` is 0
    pub fn new(pool: WorkerPool<T>, consumer: C, config: PipelineConfig) -> Result<Self> {
        if config.train_quota == 0 {
            return Err(anyhow!(
                "train_quota must be > 0: every cycle drains at least one train item"
            ));
        }
        if config.cycle_count == 0 {
            return Err(anyhow!("cycle_count must be > 0"));
        }

        Ok(Self {
            pool,
            consumer,
            config,
            cycle_index: 0,
        })
    }

    /// Runs all configured cycles, then shuts the pool down and, when a
    /// persist path is configured, saves the consumer's trained state.
    ///
    /// A cycle failure aborts the run; the pool still shuts down via drop.
    pub fn run(mut self) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::with_capacity(self.config.cycle_count);
        for _ in 0..self.config.cycle_count {
            reports.push(self.run_cycle()?);
        }

        self.pool.shutdown();

        if let Some(path) = self.config.persist_path.clone() {
            self.consumer.persist(&path).with_context(|| {
                format!("Failed to persist trained state to {}", path.display())
            })?;
        }

        Ok(reports)
    }

    /// Runs one cycle: drain train, drain validation, replace worker, report.
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        let cycle = self.cycle_index;
        let slot = cycle % self.pool.worker_count();
        let started = Instant::now();

        let mut train_loss = 0.0;
        let mut train_accuracy = 0.0;
        for draw in 0..self.config.train_quota {
            let item = self.next_item(slot, Role::Train, cycle)?;
            let metrics = self.consumer.train_step(&item).with_context(|| {
                format!(
                    "Train step failed on cycle {} (slot {}, draw {})",
                    cycle, slot, draw
                )
            })?;
            train_loss += metrics.loss;
            train_accuracy += metrics.accuracy;
        }
        let train_draws = self.config.train_quota as f64;

        let validation = if self.config.validation_quota > 0 {
            let mut items = Vec::with_capacity(self.config.validation_quota);
            for _ in 0..self.config.validation_quota {
                items.push(self.next_item(slot, Role::Validation, cycle)?);
            }
            self.consumer
                .evaluate(&items)
                .with_context(|| format!("Evaluation failed on cycle {} (slot {})", cycle, slot))?
        } else {
            StepMetrics::new(0.0, 0.0)
        };

        self.pool
            .retire_and_restart(slot)
            .with_context(|| format!("Failed to replace worker after cycle {}", cycle))?;
        self.cycle_index += 1;

        let report = CycleReport {
            cycle,
            slot,
            train_loss: train_loss / train_draws,
            train_accuracy: train_accuracy / train_draws,
            validation_loss: validation.loss,
            validation_accuracy: validation.accuracy,
            elapsed: started.elapsed(),
        };

        info!(
            cycle = report.cycle,
            slot = report.slot,
            train_loss = report.train_loss,
            train_accuracy = report.train_accuracy,
            validation_loss = report.validation_loss,
            validation_accuracy = report.validation_accuracy,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "cycle complete"
        );

        Ok(report)
    }

    /// Pops the next item from a slot, waiting up to `drain_timeout`.
    ///
    /// Fails fast when the slot's worker is dead and nothing is queued:
    /// waiting out the full timeout cannot help then.
    fn next_item(&mut self, slot: usize, role: Role, cycle: usize) -> Result<T> {
        let mut waited = Duration::ZERO;
        loop {
            match self.pool.receive(slot, self.config.poll_interval) {
                Ok(Ok(item)) => return Ok(item),
                Ok(Err(e)) => {
                    return Err(e.context(format!(
                        "Worker-side failure drained from slot {} ({:?}, cycle {})",
                        slot, role, cycle
                    )))
                }
                Err(_timeout) => {
                    waited += self.config.poll_interval;

                    if !self.pool.is_live(slot) && self.pool.queued(slot) == 0 {
                        return Err(anyhow::Error::new(PipelineError::ChannelStarvation {
                            slot,
                            role,
                            waited,
                        })
                        .context(format!(
                            "Worker on slot {} exited without filling its quota (cycle {})",
                            slot, cycle
                        )));
                    }

                    if waited >= self.config.drain_timeout {
                        return Err(anyhow::Error::new(PipelineError::ChannelStarvation {
                            slot,
                            role,
                            waited,
                        })
                        .context(format!("Pipeline stalled on cycle {}", cycle)));
                    }
                }
            }
        }
    }

    /// The pool, for introspection between cycles.
    pub fn pool(&self) -> &WorkerPool<T> {
        &self.pool
    }

    /// The consumer, for inspecting accumulated state after `run_cycle`.
    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}
