//! quizsmith-ingestion: Turns a stored PDF into chapter-tagged retrieval chunks.
//! - Per-page text extraction (lopdf)
//! - Document store lookup
//! - Chapter segmentation by title heuristics
//! - Overlapping chunking with chapter tagging

pub mod chapters;
pub mod chunker;
pub mod error;
pub mod pdf_parser;
pub mod store;

pub use chapters::{ChapterSegmenter, SegmenterConfig};
pub use chunker::{Chunker, ChunkerConfig};
pub use error::IngestionError;
pub use store::{DocumentStore, FsDocumentStore};
