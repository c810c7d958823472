use ragpipe_core::traits::Embedder;
use ragpipe_core::types::Chunk;
use ragpipe_core::Error;
use ragpipe_vector::{EmbeddingBundle, FlatL2Index};

/// Returns preset vectors in order, ignoring the texts.
struct FixedEmbedder {
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str { "fixed" }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(self.vectors.iter().take(texts.len()).cloned().collect())
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_id(&self) -> &str { "failing" }
    fn dim(&self) -> usize { 4 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("backend offline")
    }
}

fn chunks(n: usize) -> Vec<Chunk> {
    (0..n).map(|i| Chunk::new("doc", i + 1, format!("text number {i}"))).collect()
}

/// Deterministic pseudo-random vectors, no two alike.
fn vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| (0..dim).map(|j| (((i * 31 + j * 17) % 97) as f32) / 97.0 + i as f32 * 0.001).collect())
        .collect()
}

#[test]
fn ten_vectors_384_dims_top3() {
    let index = FlatL2Index::build(&vectors(10, 384)).unwrap();
    assert_eq!(index.len(), 10);
    assert_eq!(index.dim(), 384);
    let hits = index.search(&vectors(10, 384)[4], 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn identical_vector_comes_back_first_at_zero() {
    let vs = vectors(10, 384);
    let index = FlatL2Index::build(&vs).unwrap();
    let hits = index.search(&vs[7], 3).unwrap();
    assert_eq!(hits[0].position, 7);
    assert_eq!(hits[0].distance, 0.0);
}

#[test]
fn k_larger_than_index_returns_everything() {
    let index = FlatL2Index::build(&vectors(4, 8)).unwrap();
    let hits = index.search(&vectors(1, 8)[0], 50).unwrap();
    assert_eq!(hits.len(), 4);
    let mut positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[test]
fn dimension_mismatch_on_build_and_query() {
    let err = FlatL2Index::build(&[vec![0.0; 3], vec![0.0; 4]]).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {err:?}");

    let index = FlatL2Index::build(&vectors(3, 4)).unwrap();
    let err = index.search(&[0.0; 5], 1).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {err:?}");
}

#[test]
fn index_round_trip_gives_identical_results() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("index.bin");
    let vs = vectors(20, 16);
    let index = FlatL2Index::build(&vs).unwrap();
    index.save(&path).unwrap();
    let loaded = FlatL2Index::load(&path).unwrap();
    assert_eq!(loaded, index);
    for q in [&vs[0], &vs[13]] {
        assert_eq!(loaded.search(q, 5).unwrap(), index.search(q, 5).unwrap());
    }
}

#[test]
fn bundle_stays_aligned_after_save_and_load() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("embeddings.bin");
    let cs = chunks(5);
    let embedder = FixedEmbedder { vectors: vectors(5, 8), dim: 8 };
    let bundle = EmbeddingBundle::build(&cs, &embedder).unwrap();
    bundle.save(&path).unwrap();

    let loaded = EmbeddingBundle::load(&path).unwrap();
    assert_eq!(loaded, bundle);
    assert_eq!(loaded.len(), 5);
    assert_eq!(loaded.vectors().len(), loaded.texts().len());
    assert_eq!(loaded.texts().len(), loaded.metadata().len());
    for (i, c) in cs.iter().enumerate() {
        let (text, meta) = loaded.get(i).unwrap();
        assert_eq!(text, c.text);
        assert_eq!(meta, c);
    }
    assert_eq!(loaded.model_id(), "fixed");
    assert_eq!(loaded.dim(), 8);
}

#[test]
fn index_from_bundle_carries_fingerprint() {
    let embedder = FixedEmbedder { vectors: vectors(3, 4), dim: 4 };
    let bundle = EmbeddingBundle::build(&chunks(3), &embedder).unwrap();
    let index = FlatL2Index::from_bundle(&bundle).unwrap();
    assert_eq!(index.fingerprint(), bundle.fingerprint());
    assert_eq!(index.len(), bundle.len());
}

#[test]
fn empty_chunk_set_is_rejected() {
    let embedder = FixedEmbedder { vectors: vec![], dim: 4 };
    let err = EmbeddingBundle::build(&[], &embedder).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn wrong_vector_count_is_rejected() {
    let embedder = FixedEmbedder { vectors: vectors(2, 4), dim: 4 };
    let err = EmbeddingBundle::build(&chunks(3), &embedder).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn ragged_vectors_are_rejected() {
    let embedder = FixedEmbedder { vectors: vec![vec![0.0; 4], vec![0.0; 3]], dim: 4 };
    let err = EmbeddingBundle::build(&chunks(2), &embedder).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
}

#[test]
fn embedder_failure_is_service_error() {
    let err = EmbeddingBundle::build(&chunks(2), &FailingEmbedder).unwrap_err();
    match err {
        Error::Service(msg) => assert!(msg.contains("backend offline")),
        other => panic!("expected service error, got {other:?}"),
    }
}

#[test]
fn truncated_bundle_file_is_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("embeddings.bin");
    let embedder = FixedEmbedder { vectors: vectors(2, 4), dim: 4 };
    EmbeddingBundle::build(&chunks(2), &embedder).unwrap().save(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(EmbeddingBundle::load(&path), Err(Error::Parse(_))));
}

#[test]
fn bundle_with_huge_length_prefix_is_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("embeddings.bin");
    // format_version = 1, then a model_id length far beyond the file
    let mut bytes = vec![1, 0xFD];
    bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
    bytes.extend_from_slice(&[0; 16]);
    std::fs::write(&path, &bytes).unwrap();

    let err = EmbeddingBundle::load(&path).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}

#[test]
fn index_with_huge_length_prefix_is_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("index.bin");
    // format_version = 1, dim = 4, empty fingerprint, then 2^40 floats claimed
    let mut bytes = vec![1, 4, 0, 0xFD];
    bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();

    let err = FlatL2Index::load(&path).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "got {err:?}");
}
