//! Shared test sources and consumers for the pipeline integration tests.

use anyhow::Result;
use prefetch_pipeline::consumer::{Consumer, StepMetrics};
use prefetch_pipeline::error::PipelineError;
use prefetch_pipeline::source::{BatchSource, BatchStream, Role};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Polls `pred` every few milliseconds until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    pred()
}

/// Source whose items carry the role they were produced under plus a
/// per-stream sequence number. Streams are infinite.
pub struct TaggedSource;

impl BatchSource<(Role, usize)> for TaggedSource {
    fn open(&self, role: Role) -> Result<BatchStream<(Role, usize)>> {
        Ok(Box::new((0..).map(move |seq| Ok((role, seq)))))
    }
}

/// Source yielding globally unique, strictly increasing sequence numbers.
/// The counter is shared across roles, streams, and worker generations, so
/// per-slot FIFO shows up as a strictly increasing drain order.
pub struct SequenceSource {
    counter: Arc<AtomicUsize>,
}

impl SequenceSource {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BatchSource<usize> for SequenceSource {
    fn open(&self, _role: Role) -> Result<BatchStream<usize>> {
        let counter = self.counter.clone();
        Ok(Box::new(std::iter::from_fn(move || {
            Some(Ok(counter.fetch_add(1, Ordering::SeqCst)))
        })))
    }
}

/// Source whose train `open` starts failing after a fixed number of
/// successful opens. Used to exercise startup and restart failure paths.
pub struct FlakyOpenSource {
    ok_opens: usize,
    train_opens: AtomicUsize,
}

impl FlakyOpenSource {
    pub fn new(ok_opens: usize) -> Self {
        Self {
            ok_opens,
            train_opens: AtomicUsize::new(0),
        }
    }

    pub fn train_opens(&self) -> usize {
        self.train_opens.load(Ordering::SeqCst)
    }
}

impl BatchSource<usize> for FlakyOpenSource {
    fn open(&self, role: Role) -> Result<BatchStream<usize>> {
        if role == Role::Train {
            let seen = self.train_opens.fetch_add(1, Ordering::SeqCst);
            if seen >= self.ok_opens {
                return Err(PipelineError::SourceUnavailable {
                    role,
                    reason: "backing data directory is gone".to_string(),
                }
                .into());
            }
        }
        Ok(Box::new((0..).map(Ok)))
    }
}

/// Source whose streams hold a guard while alive, exposing how many streams
/// (and therefore how many workers) still exist. Each worker generation owns
/// its streams, so a zero gauge means every worker has exited.
pub struct GuardedSource {
    live_streams: Arc<AtomicIsize>,
}

struct StreamGuard(Arc<AtomicIsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl GuardedSource {
    pub fn new() -> Self {
        Self {
            live_streams: Arc::new(AtomicIsize::new(0)),
        }
    }

    pub fn gauge(&self) -> Arc<AtomicIsize> {
        self.live_streams.clone()
    }
}

impl BatchSource<usize> for GuardedSource {
    fn open(&self, _role: Role) -> Result<BatchStream<usize>> {
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        let guard = StreamGuard(self.live_streams.clone());
        let mut seq = 0;
        Ok(Box::new(std::iter::from_fn(move || {
            let _ = &guard;
            seq += 1;
            Some(Ok(seq))
        })))
    }
}

/// Source whose streams yield a fixed number of items and then block inside
/// `next` for far longer than any test runs. Models a backing store that
/// hangs mid-read, leaving the worker stuck where it cannot see its flag.
pub struct StallingSource {
    ok_items: usize,
}

impl StallingSource {
    pub fn new(ok_items: usize) -> Self {
        Self { ok_items }
    }
}

impl BatchSource<usize> for StallingSource {
    fn open(&self, _role: Role) -> Result<BatchStream<usize>> {
        let n = self.ok_items;
        let mut produced = 0;
        Ok(Box::new(std::iter::from_fn(move || {
            if produced >= n {
                thread::sleep(Duration::from_secs(3600));
            }
            produced += 1;
            Some(Ok(produced))
        })))
    }
}

/// Shared handles into a [`RecordingConsumer`]'s observations. Kept by the
/// test while the consumer itself is moved into the coordinator.
pub struct Recorder<T> {
    pub trains: Arc<Mutex<Vec<T>>>,
    pub evals: Arc<Mutex<Vec<Vec<T>>>>,
    pub persists: Arc<Mutex<Vec<PathBuf>>>,
}

impl<T> Recorder<T> {
    pub fn new() -> Self {
        Self {
            trains: Arc::new(Mutex::new(Vec::new())),
            evals: Arc::new(Mutex::new(Vec::new())),
            persists: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn train_calls(&self) -> usize {
        self.trains.lock().unwrap().len()
    }

    pub fn eval_calls(&self) -> usize {
        self.evals.lock().unwrap().len()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            trains: self.trains.clone(),
            evals: self.evals.clone(),
            persists: self.persists.clone(),
        }
    }
}

/// Consumer that records every item it sees and returns fixed metrics.
pub struct RecordingConsumer<T> {
    recorder: Recorder<T>,
    metrics: StepMetrics,
}

impl<T> RecordingConsumer<T> {
    pub fn new(recorder: Recorder<T>, metrics: StepMetrics) -> Self {
        Self { recorder, metrics }
    }
}

impl<T: Clone> Consumer<T> for RecordingConsumer<T> {
    fn train_step(&mut self, item: &T) -> Result<StepMetrics> {
        self.recorder.trains.lock().unwrap().push(item.clone());
        Ok(self.metrics)
    }

    fn evaluate(&mut self, items: &[T]) -> Result<StepMetrics> {
        self.recorder.evals.lock().unwrap().push(items.to_vec());
        Ok(self.metrics)
    }

    fn persist(&mut self, path: &Path) -> Result<()> {
        self.recorder.persists.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
