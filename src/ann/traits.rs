//! Trait implemented by external ANN plugins.

use crate::database::FeatureDatabase;
use crate::error::{Result, RetrieveError};

/// Nearest-neighbour index living outside the engine.
pub trait ExternalAnnIndex {
    /// Build over `count` row-major vectors of `dimension` components,
    /// tuned to answer `k`-neighbour queries.
    fn build(&mut self, dimension: usize, count: usize, k: usize, data: &[f32]) -> Result<()>;

    /// Row positions of up to `k` approximate neighbours of `query`.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<usize>>;
}

/// Hand every descriptor of `db` to `index`.
pub fn build_external<I: ExternalAnnIndex + ?Sized>(
    index: &mut I,
    db: &FeatureDatabase,
    k: usize,
) -> Result<()> {
    if db.is_empty() {
        return Err(RetrieveError::EmptyDatabase);
    }
    let dimension = db.layout().len();
    let data = db.to_flat();
    debug_assert_eq!(data.len(), dimension * db.len());
    index.build(dimension, db.len(), k, &data)
}
