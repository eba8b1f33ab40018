//! src/source.rs
//!
//! Batch sources: where producer workers pull their items from.
//!
//! A `BatchSource` yields one lazy stream per role. The stream is logically
//! infinite for however many items the worker's quota draws from it; the
//! provided implementations restart from the beginning when they run out of
//! data, and restarting is transparent to the caller.
//!
//! Opening a stream may touch the filesystem or run transforms, but must not
//! block indefinitely. If the backing data is missing, `open` fails with
//! [`PipelineError::SourceUnavailable`].

use crate::batch::Batch;
use crate::error::PipelineError;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Which phase of the run a stream (or an item drawn from it) belongs to.
///
/// A worker produces its full `Train` quota before it opens the `Validation`
/// stream; roles are never interleaved within one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Train,
    Validation,
}

/// A lazy stream of work items for one role.
///
/// Item-level failures travel in-band as `Err` so a worker can forward them
/// to the coordinator through its channel.
pub type BatchStream<T> = Box<dyn Iterator<Item = Result<T>> + Send>;

/// A restartable per-role supplier of work items.
///
/// Implementations must be `Send + Sync`: one source instance is shared by
/// every worker in the pool (via `Arc`), and each worker opens its own
/// streams from it.
pub trait BatchSource<T>: Send + Sync {
    /// Opens a fresh stream for `role`.
    ///
    /// Called once per role per worker generation: the train stream by the
    /// pool when launching the worker, the validation stream by the worker
    /// itself once its train quota is filled.
    fn open(&self, role: Role) -> Result<BatchStream<T>>;
}

/// A cycling in-memory source backed by one item vector per role.
///
/// Intended for tests, benchmarks, and datasets that fit in RAM. The stream
/// repeats the items forever in order, so any quota can be drawn from it.
///
/// # Examples:
/// ```
/// use prefetch_pipeline::source::{BatchSource, InMemorySource, Role};
///
/// let source = InMemorySource::new(vec![1, 2, 3], vec![10, 20]);
/// let mut stream = source.open(Role::Train).unwrap();
/// let first: Vec<i32> = (0..4).map(|_| stream.next().unwrap().unwrap()).collect();
/// assert_eq!(first, vec![1, 2, 3, 1]);
/// ```
pub struct InMemorySource<T> {
    train_items: Vec<T>,
    validation_items: Vec<T>,
}

impl<T> InMemorySource<T> {
    pub fn new(train_items: Vec<T>, validation_items: Vec<T>) -> Self {
        Self {
            train_items,
            validation_items,
        }
    }
}

impl<T> BatchSource<T> for InMemorySource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn open(&self, role: Role) -> Result<BatchStream<T>> {
        let items = match role {
            Role::Train => &self.train_items,
            Role::Validation => &self.validation_items,
        };
        if items.is_empty() {
            return Err(PipelineError::SourceUnavailable {
                role,
                reason: "no items for this role".to_string(),
            }
            .into());
        }
        let items = items.clone();
        Ok(Box::new(items.into_iter().cycle().map(Ok)))
    }
}

/// An infinite source of seeded random batches.
///
/// Stands in for a real directory-reading batch generator when exercising or
/// benchmarking the pipeline: every item is a `Batch<Vec<f32>, Vec<f32>>`
/// with `batch_size * item_len` uniform inputs and `batch_size` binary
/// labels. Streams are deterministic per `(seed, role)`, so two workers
/// opened from the same source with the same role produce identical data.
pub struct SyntheticSource {
    item_len: usize,
    batch_size: usize,
    seed: u64,
}

impl SyntheticSource {
    /// Creates a synthetic source.
    ///
    /// # Arguments
    /// - `item_len`: flattened length of one input example (e.g. `w * h * c`)
    /// - `batch_size`: examples per batch
    /// - `seed`: base seed; the role index is mixed in so train and
    ///   validation streams differ
    pub fn new(item_len: usize, batch_size: usize, seed: u64) -> Self {
        Self {
            item_len,
            batch_size,
            seed,
        }
    }
}

impl BatchSource<Batch<Vec<f32>, Vec<f32>>> for SyntheticSource {
    fn open(&self, role: Role) -> Result<BatchStream<Batch<Vec<f32>, Vec<f32>>>> {
        let role_offset = match role {
            Role::Train => 0,
            Role::Validation => 1,
        };
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(role_offset));
        let item_len = self.item_len;
        let batch_size = self.batch_size;

        Ok(Box::new(std::iter::from_fn(move || {
            let inputs: Vec<f32> = (0..batch_size * item_len)
                .map(|_| rng.random::<f32>())
                .collect();
            let labels: Vec<f32> = (0..batch_size)
                .map(|_| if rng.random_bool(0.5) { 1.0 } else { 0.0 })
                .collect();
            Some(Ok(Batch::new(inputs, labels)))
        })))
    }
}
