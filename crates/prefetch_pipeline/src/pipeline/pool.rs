//! src/pipeline/pool.rs
//!
//! Worker pool: the slot table and worker lifecycle operations.
//!
//! The pool owns a fixed-size array of slots. Each slot is one bounded
//! channel plus the worker currently bound to it. Channel identity is stable
//! for the pool's lifetime; the worker bound to a slot is replaced over time
//! by `retire_and_restart`.
//!
//! # Invariants
//! - At most one live worker is bound to a slot at any time: launching always
//!   follows joining the previous generation.
//! - A worker only ever holds the sender for its own slot.
//! - Retiring a worker never clears its channel; items already queued remain
//!   available to future draws.

use crate::error::PipelineError;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::worker::{run_worker, WorkerContext};
use crate::source::{BatchSource, Role};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Grace period before a flagged worker is detached instead of joined (milliseconds)
const JOIN_TIMEOUT_MS: u64 = 1000;

/// Handle to one live worker generation.
struct WorkerHandle {
    thread: thread::JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

/// One slot: a stable channel plus whichever worker currently feeds it.
struct SlotState<T> {
    // The pool keeps a sender alive so the channel survives worker
    // replacement and the receiving side never observes a disconnect.
    tx: Sender<Result<T>>,
    rx: Receiver<Result<T>>,
    worker: Option<WorkerHandle>,
    generation: usize,
}

/// Fixed-size pool of producer workers, one per slot.
///
/// Created fully started via [`WorkerPool::start`]. Dropping the pool shuts
/// every worker down and joins it.
pub struct WorkerPool<T: Send + 'static> {
    source: Arc<dyn BatchSource<T>>,
    slots: Vec<SlotState<T>>,
    train_quota: usize,
    validation_quota: usize,
    poll_interval: Duration,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates one bounded channel per slot and launches one worker per slot.
    ///
    /// Each launch opens the worker's train stream on the calling thread, so
    /// a `SourceUnavailable` surfaces here and no further workers are
    /// launched after the first failure.
    pub fn start(source: Arc<dyn BatchSource<T>>, config: &PipelineConfig) -> Result<Self> {
        if config.worker_count == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with 0 workers. \
                At least one slot is needed to produce items."
            ));
        }
        if config.channel_capacity == 0 {
            return Err(anyhow!(
                "Cannot create WorkerPool with channel_capacity 0. \
                Capacity must be > 0 to prevent deadlocks."
            ));
        }
        if config.poll_interval.is_zero() {
            return Err(anyhow!(
                "Cannot create WorkerPool with a zero poll_interval. \
                Blocked workers would busy-spin instead of sleeping."
            ));
        }

        let mut slots = Vec::with_capacity(config.worker_count);
        for _ in 0..config.worker_count {
            let (tx, rx) = bounded(config.channel_capacity);
            slots.push(SlotState {
                tx,
                rx,
                worker: None,
                generation: 0,
            });
        }

        let mut pool = Self {
            source,
            slots,
            train_quota: config.train_quota,
            validation_quota: config.validation_quota,
            poll_interval: config.poll_interval,
        };

        for slot in 0..config.worker_count {
            pool.launch(slot)
                .with_context(|| format!("Failed to start worker for slot {}", slot))?;
        }

        Ok(pool)
    }

    /// Forcibly terminates the worker bound to `slot` and launches a fresh
    /// one bound to the same channel.
    ///
    /// Idempotent with respect to the old worker: if it already exited
    /// naturally, only the replacement launch happens. Returns once the new
    /// worker is running; it does not wait for it to produce.
    pub fn retire_and_restart(&mut self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        self.retire(slot);
        self.launch(slot)
            .with_context(|| format!("Failed to restart worker for slot {}", slot))
    }

    /// Blocking receive from a slot's channel with timeout.
    ///
    /// The outer error is a timeout (the channel itself cannot disconnect
    /// while the pool lives); the inner `Result` is the item as produced,
    /// carrying any worker-side failure in-band.
    pub fn receive(&self, slot: usize, timeout: Duration) -> Result<Result<T>> {
        self.check_slot(slot)?;
        self.slots[slot].rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                anyhow!("No item from slot {} after {:?}", slot, timeout)
            }
            RecvTimeoutError::Disconnected => {
                anyhow!("Slot {} channel disconnected", slot)
            }
        })
    }

    /// Terminates every remaining worker.
    ///
    /// Flags are set before any join so all workers wind down concurrently.
    /// Each worker gets a grace period of `JOIN_TIMEOUT_MS` to finish; one
    /// blocked inside its source is detached instead of joined, so teardown
    /// is bounded. Called automatically on drop; also the explicit
    /// end-of-run teardown.
    pub fn shutdown(&mut self) {
        for slot in &self.slots {
            if let Some(handle) = &slot.worker {
                handle.shutdown.store(true, Ordering::Relaxed);
            }
        }
        for (slot, state) in self.slots.iter_mut().enumerate() {
            if let Some(handle) = state.worker.take() {
                join_or_detach(slot, handle);
            }
        }
    }

    /// Number of slots in the pool.
    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether the worker bound to `slot` is still running.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn is_live(&self, slot: usize) -> bool {
        self.slots[slot]
            .worker
            .as_ref()
            .map(|h| !h.thread.is_finished())
            .unwrap_or(false)
    }

    /// Items currently queued in a slot's channel.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn queued(&self, slot: usize) -> usize {
        self.slots[slot].rx.len()
    }

    /// How many workers have been launched for `slot` so far (starts at 1).
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn generation(&self, slot: usize) -> usize {
        self.slots[slot].generation
    }

    /// Signals the current worker of `slot` and joins it, detaching after
    /// the grace period if it is blocked inside its source. No-op if the
    /// slot has no worker or the worker already exited.
    fn retire(&mut self, slot: usize) {
        if let Some(handle) = self.slots[slot].worker.take() {
            handle.shutdown.store(true, Ordering::Relaxed);
            join_or_detach(slot, handle);
        }
    }

    /// Opens a fresh train stream and spawns a new worker generation bound
    /// to the slot's existing channel.
    ///
    /// Precondition: no live worker on `slot` (callers retire first).
    fn launch(&mut self, slot: usize) -> Result<()> {
        let train_stream = self
            .source
            .open(Role::Train)
            .with_context(|| format!("Slot {} could not open train stream", slot))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext {
            slot,
            source: self.source.clone(),
            train_stream,
            train_quota: self.train_quota,
            validation_quota: self.validation_quota,
            tx: self.slots[slot].tx.clone(),
            shutdown: shutdown.clone(),
            poll_interval: self.poll_interval,
        };

        let thread = match thread::Builder::new()
            .name(format!("prefetch-worker-{}", slot))
            .spawn(move || run_worker(ctx))
        {
            Ok(handle) => handle,
            Err(e) => {
                return Err(anyhow::Error::from(e)
                    .context(PipelineError::WorkerLaunchFailure { slot }))
            }
        };

        let state = &mut self.slots[slot];
        state.worker = Some(WorkerHandle { thread, shutdown });
        state.generation += 1;
        debug!(slot, generation = state.generation, "worker launched");
        Ok(())
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slots.len() {
            return Err(anyhow!(
                "Slot {} out of range: pool has {} slots",
                slot,
                self.slots.len()
            ));
        }
        Ok(())
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Joins a flagged worker, waiting up to `JOIN_TIMEOUT_MS` for it to wind
/// down. A worker blocked inside `BatchSource::open` or `Iterator::next`
/// never observes its flag, so past the grace period the handle is dropped
/// and the thread is left to finish on its own.
///
/// Safe to detach: the caller has already set the shutdown flag, and a
/// worker checks that flag before every push, so a detached worker can
/// never send another item. The slot keeps a single effective producer.
fn join_or_detach(slot: usize, handle: WorkerHandle) {
    let deadline = Instant::now() + Duration::from_millis(JOIN_TIMEOUT_MS);
    while Instant::now() < deadline {
        if handle.thread.is_finished() {
            let _ = handle.thread.join();
            debug!(slot, "worker joined");
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    warn!(
        slot,
        "worker blocked in its source past {}ms, detaching", JOIN_TIMEOUT_MS
    );
}
