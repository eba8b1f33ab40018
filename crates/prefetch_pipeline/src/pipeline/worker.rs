//! src/pipeline/worker.rs
//!
//! The producer loop run by each worker thread.
//!
//! A worker bridges one `BatchSource` to one slot channel under per-role
//! quotas: it pushes `train_quota` train items, then `validation_quota`
//! validation items, then exits. It never reads from the channel and never
//! coordinates with other workers.
//!
//! # Lifecycle
//! - The train stream is opened by the pool before the thread is spawned, so
//!   a missing source fails the launch rather than the run.
//! - The validation stream is opened lazily, only after the train quota is
//!   filled; an open failure at that point is forwarded in-band.
//! - A push to a full channel blocks (backpressure), but in `poll_interval`
//!   steps that re-check the retirement flag, so a blocked worker can still
//!   be retired promptly.

use crate::source::{BatchSource, BatchStream, Role};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything a worker thread needs, moved into the thread on spawn.
pub(crate) struct WorkerContext<T> {
    pub(crate) slot: usize,
    pub(crate) source: Arc<dyn BatchSource<T>>,
    pub(crate) train_stream: BatchStream<T>,
    pub(crate) train_quota: usize,
    pub(crate) validation_quota: usize,
    pub(crate) tx: Sender<Result<T>>,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) poll_interval: Duration,
}

/// Thread body for one worker generation.
pub(crate) fn run_worker<T: Send + 'static>(ctx: WorkerContext<T>) {
    let WorkerContext {
        slot,
        source,
        train_stream,
        train_quota,
        validation_quota,
        tx,
        shutdown,
        poll_interval,
    } = ctx;

    debug!(slot, "worker started");

    if !produce_role(
        slot,
        Role::Train,
        train_stream,
        train_quota,
        &tx,
        &shutdown,
        poll_interval,
    ) {
        return;
    }

    if validation_quota > 0 {
        // Deferred open: the validation stream only exists once the train
        // quota is filled, mirroring the production order seen downstream.
        let validation_stream = match source
            .open(Role::Validation)
            .with_context(|| format!("Slot {} failed to open validation stream", slot))
        {
            Ok(stream) => stream,
            Err(e) => {
                let _ = push_item(&tx, &shutdown, poll_interval, Err(e));
                return;
            }
        };

        if !produce_role(
            slot,
            Role::Validation,
            validation_stream,
            validation_quota,
            &tx,
            &shutdown,
            poll_interval,
        ) {
            return;
        }
    }

    debug!(slot, "worker filled all quotas, exiting");
}

/// Pushes `quota` items of one role onto the slot channel.
///
/// Returns `false` if the worker must stop early: retirement was signalled,
/// the channel closed, or the stream failed. Stream failures are forwarded
/// through the channel first so the coordinator sees them in-band.
fn produce_role<T>(
    slot: usize,
    role: Role,
    mut stream: BatchStream<T>,
    quota: usize,
    tx: &Sender<Result<T>>,
    shutdown: &AtomicBool,
    poll_interval: Duration,
) -> bool {
    for produced in 0..quota {
        if shutdown.load(Ordering::Relaxed) {
            debug!(slot, ?role, produced, "worker retired mid-role");
            return false;
        }

        let item = match stream.next() {
            Some(Ok(item)) => Ok(item),
            Some(Err(e)) => {
                let err = e.context(format!(
                    "Slot {} failed to load {:?} item {} of {}",
                    slot,
                    role,
                    produced + 1,
                    quota
                ));
                let _ = push_item(tx, shutdown, poll_interval, Err(err));
                return false;
            }
            None => {
                let err = anyhow!(
                    "Slot {} {:?} stream ended after {} of {} items; \
                    batch sources must be restartable",
                    slot,
                    role,
                    produced,
                    quota
                );
                let _ = push_item(tx, shutdown, poll_interval, Err(err));
                return false;
            }
        };

        if !push_item(tx, shutdown, poll_interval, item) {
            return false;
        }
    }
    true
}

/// Backpressured push that stays responsive to retirement.
///
/// Blocks while the channel is full, waking every `poll_interval` to check
/// the shutdown flag. Returns `false` if retirement was signalled or the
/// receiving side is gone.
fn push_item<T>(
    tx: &Sender<Result<T>>,
    shutdown: &AtomicBool,
    poll_interval: Duration,
    mut item: Result<T>,
) -> bool {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        match tx.send_timeout(item, poll_interval) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
