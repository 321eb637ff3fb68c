use crate::error::Result;
use crate::feature::compose;
use crate::image::Image;
use crate::index::{RankedResult, SimilarityIndex};

/// Rank the dataset held by `index` against `query`, returning at most `k` rows.
///
/// Descriptor and index errors are returned unchanged.
pub fn retrieve<'a>(
    query: &Image,
    index: &'a SimilarityIndex,
    k: usize,
) -> Result<Vec<RankedResult<'a>>> {
    let vector = compose(query)?;
    index.query(&vector, k)
}
