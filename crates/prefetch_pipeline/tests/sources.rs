//! Tests for the provided batch sources.

use anyhow::Result;
use prefetch_pipeline::batch::Batch;
use prefetch_pipeline::error::PipelineError;
use prefetch_pipeline::source::{BatchSource, InMemorySource, Role, SyntheticSource};

#[test]
fn test_inmemory_source_cycles() -> Result<()> {
    let source = InMemorySource::new(vec!["a", "b", "c"], vec!["v"]);

    let train: Vec<&str> = source
        .open(Role::Train)?
        .take(7)
        .collect::<Result<_>>()?;
    assert_eq!(train, vec!["a", "b", "c", "a", "b", "c", "a"]);

    let validation: Vec<&str> = source
        .open(Role::Validation)?
        .take(3)
        .collect::<Result<_>>()?;
    assert_eq!(validation, vec!["v", "v", "v"]);
    Ok(())
}

#[test]
fn test_inmemory_source_empty_role_unavailable() {
    let source: InMemorySource<u32> = InMemorySource::new(vec![1], vec![]);

    let err = source.open(Role::Validation).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SourceUnavailable {
            role: Role::Validation,
            ..
        })
    ));
}

#[test]
fn test_synthetic_source_shapes() -> Result<()> {
    let source = SyntheticSource::new(16, 4, 7);
    let mut stream = source.open(Role::Train)?;

    for _ in 0..3 {
        let batch: Batch<Vec<f32>, Vec<f32>> = stream.next().unwrap()?;
        assert_eq!(batch.inputs.len(), 4 * 16);
        assert_eq!(batch.labels.len(), 4);
        assert!(batch.labels.iter().all(|&l| l == 0.0 || l == 1.0));
    }
    Ok(())
}

#[test]
fn test_synthetic_source_deterministic_per_seed_and_role() -> Result<()> {
    let source = SyntheticSource::new(8, 2, 42);

    let a: Vec<_> = source.open(Role::Train)?.take(3).collect::<Result<_>>()?;
    let b: Vec<_> = source.open(Role::Train)?.take(3).collect::<Result<_>>()?;
    assert_eq!(a, b, "same seed and role must replay the same stream");

    let v: Vec<_> = source
        .open(Role::Validation)?
        .take(3)
        .collect::<Result<_>>()?;
    assert_ne!(a, v, "train and validation streams must differ");
    Ok(())
}
