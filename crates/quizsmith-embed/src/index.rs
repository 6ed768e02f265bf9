//! Per-request vector index over embedded chunks.
//!
//! An index is built for one request and dropped with it; nothing is shared
//! between requests.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use quizsmith_common::Chunk;
use tracing::{debug, instrument};

use crate::embedder::{dot, l2_normalize, Embedder};
use crate::error::{EmbedError, Result};

/// Metadata restriction applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    /// Exact chapter label; chunks without a chapter never match.
    pub chapter: Option<String>,
}

impl ChunkFilter {
    pub fn chapter(label: impl Into<String>) -> Self {
        Self { chapter: Some(label.into()) }
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        match &self.chapter {
            Some(label) => chunk.chapter.as_deref() == Some(label.as_str()),
            None        => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity to the query.
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` chunks passing `filter`, best match first.
    async fn query(&self, text: &str, filter: &ChunkFilter, k: usize) -> Result<Vec<ScoredChunk>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait IndexBuilder: Send + Sync {
    async fn build(&self, chunks: Vec<Chunk>) -> Result<Box<dyn VectorIndex>>;
}

// ── In-memory implementation ──────────────────────────────────────────────────

/// Brute-force cosine index. Vectors are stored normalized.
pub struct InMemoryVectorIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(Chunk, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>, entries: Vec<(Chunk, Vec<f32>)>) -> Self {
        Self { embedder, entries }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    #[instrument(skip(self, text, filter), fields(entries = self.entries.len(), chapter = ?filter.chapter))]
    async fn query(&self, text: &str, filter: &ChunkFilter, k: usize) -> Result<Vec<ScoredChunk>> {
        let candidates: Vec<&(Chunk, Vec<f32>)> =
            self.entries.iter().filter(|(chunk, _)| filter.matches(chunk)).collect();
        if candidates.is_empty() || k == 0 {
            debug!(candidates = candidates.len(), "Nothing to rank");
            return Ok(Vec::new());
        }

        let mut query = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::InvalidResponse("no vector for query".to_string()))?;
        l2_normalize(&mut query);

        let mut scored = Vec::with_capacity(candidates.len());
        for (chunk, vector) in candidates {
            if vector.len() != query.len() {
                return Err(EmbedError::InvalidResponse(format!(
                    "query dimension {} does not match index dimension {}",
                    query.len(),
                    vector.len()
                )));
            }
            scored.push(ScoredChunk { chunk: chunk.clone(), score: dot(&query, vector) });
        }
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk.index.cmp(&b.chunk.index))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Drop for InMemoryVectorIndex {
    fn drop(&mut self) {
        debug!(entries = self.entries.len(), "Vector index released");
    }
}

/// Embeds chunks with an [`Embedder`] and stores them in an [`InMemoryVectorIndex`].
pub struct EmbeddingIndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl EmbeddingIndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self { embedder, batch_size: batch_size.max(1) }
    }
}

#[async_trait]
impl IndexBuilder for EmbeddingIndexBuilder {
    #[instrument(skip_all, fields(chunks = chunks.len(), embedder = self.embedder.name()))]
    async fn build(&self, chunks: Vec<Chunk>) -> Result<Box<dyn VectorIndex>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self.embedder.embed(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(EmbedError::InvalidResponse(format!(
                    "embedder returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }
            vectors.extend(embedded);
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, mut vector)| {
                l2_normalize(&mut vector);
                (chunk, vector)
            })
            .collect::<Vec<_>>();
        debug!(entries = entries.len(), "Vector index built");
        Ok(Box::new(InMemoryVectorIndex::new(self.embedder.clone(), entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbedder;
    use pretty_assertions::assert_eq;

    fn chunk(index: usize, chapter: Option<&str>, text: &str) -> Chunk {
        Chunk {
            index,
            page: index as u32 + 1,
            chapter: chapter.map(str::to_string),
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk(0, Some("Chapter 1: Cells"), "The cell membrane controls what enters the cell."),
            chunk(1, Some("Chapter 1: Cells"), "Mitochondria produce ATP for the cell."),
            chunk(2, Some("Chapter 2: Genetics"), "Genes are segments of DNA on chromosomes."),
            chunk(3, Some("Chapter 2: Genetics"), "Alleles are variants of a gene."),
            chunk(4, None, "Index and glossary of cell and gene terms."),
        ]
    }

    async fn build(chunks: Vec<Chunk>) -> Box<dyn VectorIndex> {
        let builder = EmbeddingIndexBuilder::new(Arc::new(HashingEmbedder::new(256)), 2);
        builder.build(chunks).await.unwrap()
    }

    #[tokio::test]
    async fn test_chapter_filter_is_exact() {
        let index = build(corpus()).await;
        assert_eq!(index.len(), 5);

        let hits = index.query("genes and DNA", &ChunkFilter::chapter("Chapter 2: Genetics"), 10).await.unwrap();
        let pages: Vec<usize> = hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(hits.len(), 2);
        assert!(pages.contains(&2) && pages.contains(&3));

        let none = index.query("genes", &ChunkFilter::chapter("chapter 2: genetics"), 10).await.unwrap();
        assert!(none.is_empty(), "filter must not be case-folded");
    }

    #[tokio::test]
    async fn test_results_are_ranked_and_truncated() {
        let index = build(corpus()).await;
        let hits = index.query("mitochondria produce ATP", &ChunkFilter::chapter("Chapter 1: Cells"), 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.index, 1);

        let all = index.query("cell", &ChunkFilter::default(), 10).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_untagged_chunks_never_match_a_chapter() {
        let index = build(corpus()).await;
        let hits = index.query("glossary", &ChunkFilter::chapter("Chapter 1: Cells"), 10).await.unwrap();
        assert!(hits.iter().all(|h| h.chunk.chapter.is_some()));
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty_result() {
        let index = build(Vec::new()).await;
        assert!(index.is_empty());
        let hits = index.query("anything", &ChunkFilter::chapter("Introduction"), 4).await.unwrap();
        assert!(hits.is_empty());
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }
        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_rejected() {
        let builder = EmbeddingIndexBuilder::new(Arc::new(ShortEmbedder), 8);
        let err = builder.build(corpus()).await.err().unwrap();
        assert!(matches!(err, EmbedError::InvalidResponse(_)));
    }
}
