//! Chapter-restricted retrieval over a [`VectorIndex`].

use quizsmith_common::Chunk;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::index::{ChunkFilter, VectorIndex};

/// Up to `k` chunks tagged exactly `chapter`, most relevant first.
///
/// A chapter with no indexed chunks yields an empty list rather than an error.
#[instrument(skip(index, query), fields(indexed = index.len()))]
pub async fn retrieve(
    index: &dyn VectorIndex,
    query: &str,
    chapter: &str,
    k: usize,
) -> Result<Vec<Chunk>> {
    let hits = index.query(query, &ChunkFilter::chapter(chapter), k).await?;
    if hits.is_empty() {
        warn!(chapter, "No chunks matched the chapter filter; generating from empty context");
    } else {
        debug!(hits = hits.len(), top_score = hits[0].score, "Context retrieved");
    }
    Ok(hits.into_iter().map(|h| h.chunk).collect())
}
