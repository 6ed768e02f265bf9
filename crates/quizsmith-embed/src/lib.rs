//! quizsmith-embed: Chunk embedding and per-request vector retrieval.
//! - Local sentence-transformers model via Candle (default)
//! - Deterministic hashing embedder for offline tests
//! - Remote embedding backends (Gemini, OpenAI, OpenAI-compatible, Ollama)
//! - In-memory cosine index with exact chapter filtering
//! - Chapter-scoped retrieval

pub mod client;
pub mod embedder;
pub mod error;
pub mod hashing;
pub mod index;
pub mod local;
pub mod pooling;
pub mod retriever;

pub use client::EmbeddingClient;
pub use embedder::{embedder_from_config, Embedder};
pub use error::EmbedError;
pub use hashing::HashingEmbedder;
pub use index::{ChunkFilter, EmbeddingIndexBuilder, InMemoryVectorIndex, IndexBuilder, ScoredChunk, VectorIndex};
pub use local::LocalEmbedder;
pub use retriever::retrieve;
