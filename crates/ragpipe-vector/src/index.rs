//! Vector Index: exhaustive squared-L2 nearest-neighbour search.

use std::cmp::Ordering;
use std::path::Path;

use bincode::{Decode, Encode};
use tracing::{debug, info};

use ragpipe_core::persist::{load_binary, save_binary};
use ragpipe_core::{Error, Result};

use crate::bundle::EmbeddingBundle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Vectors stored row-major in one flat buffer; row `i` is bundle position `i`.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FlatL2Index {
    format_version: u32,
    dim: usize,
    fingerprint: String,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(Error::InvalidConfig("cannot build an index over zero vectors".into()));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(Error::Validation("index vectors have zero length".into()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::Validation(format!(
                    "vector {i} has dimension {} but the index has {dim}",
                    v.len()
                )));
            }
            data.extend_from_slice(v);
        }
        Ok(Self { format_version: Self::FORMAT_VERSION, dim, fingerprint: String::new(), data })
    }

    /// Indexes the bundle's vectors and records its fingerprint.
    pub fn from_bundle(bundle: &EmbeddingBundle) -> Result<Self> {
        let mut index = Self::build(bundle.vectors())?;
        index.fingerprint = bundle.fingerprint().to_string();
        info!(count = index.len(), dim = index.dim, "built flat L2 index");
        Ok(index)
    }

    /// The `k` nearest positions, closest first; equal distances keep position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::Validation(format!(
                "query has dimension {} but the index has {}",
                query.len(),
                self.dim
            )));
        }
        if let Some(i) = query.iter().position(|x| !x.is_finite()) {
            return Err(Error::Validation(format!("query component {i} is not finite")));
        }
        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| Neighbor { position, distance: nan_as_infinity(euclidean_distance_squared(query, row)) })
            .collect();

        let k = k.min(hits.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, by_distance_then_position);
            hits.truncate(k);
        }
        hits.sort_by(by_distance_then_position);
        debug!(k, best = hits[0].distance, "searched index");
        Ok(hits)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_binary(path, self)?;
        info!(count = self.len(), path = %path.display(), "saved index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let index: Self = load_binary(path)?;
        if index.format_version != Self::FORMAT_VERSION {
            return Err(Error::InvalidConfig(format!(
                "index format version {} is not supported (expected {})",
                index.format_version,
                Self::FORMAT_VERSION
            )));
        }
        if index.dim == 0 || index.data.len() % index.dim != 0 {
            return Err(Error::InvalidConfig(format!(
                "index data of {} floats does not divide into rows of {}",
                index.data.len(),
                index.dim
            )));
        }
        info!(count = index.len(), path = %path.display(), "loaded index");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Fingerprint of the bundle this index was built from; empty for [`FlatL2Index::build`].
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

// NaN of either sign would otherwise sort around the finite distances.
fn nan_as_infinity(distance: f32) -> f32 {
    if distance.is_nan() { f32::INFINITY } else { distance }
}

fn by_distance_then_position(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance.total_cmp(&b.distance).then(a.position.cmp(&b.position))
}

pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0;
    let n = a.len().min(b.len());
    let mut i = 0;

    // Unrolling 4
    while i + 3 < n {
        let d0 = a[i] - b[i];
        let d1 = a[i + 1] - b[i + 1];
        let d2 = a[i + 2] - b[i + 2];
        let d3 = a[i + 3] - b[i + 3];
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
        i += 4;
    }

    while i < n {
        let d = a[i] - b[i];
        sum += d * d;
        i += 1;
    }

    sum
}
