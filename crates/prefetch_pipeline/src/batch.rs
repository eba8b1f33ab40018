/// A `Batch` is one unit of work exchanged between a producer worker and the
/// coordinator: a pair of input payloads and their matching label payloads.
///
/// The payload types are opaque to the pipeline. A vision source might use
/// `Batch<Vec<f32>, Vec<f32>>` (flattened pixels + class labels); a text
/// source might carry token id vectors. The shape of a batch is fixed by the
/// source that produced it, and a batch is immutable once produced.
///
/// # Examples:
/// ```
/// use prefetch_pipeline::Batch;
///
/// let batch = Batch::new(vec![0.1_f32, 0.2, 0.3], vec![1_i64]);
/// assert_eq!(batch.labels, vec![1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<I, L> {
    pub inputs: I,
    pub labels: L,
}

impl<I, L> Batch<I, L> {
    /// Creates a new batch from an input payload and a label payload.
    pub fn new(inputs: I, labels: L) -> Self {
        Self { inputs, labels }
    }
}
