//! Embedding store and exhaustive vector index.
//!
//! Both artifacts are single bincode files written atomically and tagged with
//! the same build fingerprint so a retriever can tell whether they belong together.

pub mod bundle;
pub mod fingerprint;
pub mod index;

pub use bundle::{BundleHeader, EmbeddingBundle};
pub use fingerprint::build_fingerprint;
pub use index::{FlatL2Index, Neighbor};
