//! Quiz request orchestration.
//!
//! Each request resolves its document, segments it into chapters, chunks and
//! indexes only the requested chapter's pages, retrieves context, generates and
//! parses. Nothing is cached between requests; the index lives for the duration
//! of one request and is dropped on every exit path.

use std::sync::Arc;

use quizsmith_common::{ChapterMap, Page, QuizError, QuizRequest, QuizResponse, Result};
use quizsmith_config::{Config, RetrievalConfig};
use quizsmith_embed::{embedder_from_config, retrieve, EmbedError, EmbeddingIndexBuilder, IndexBuilder};
use quizsmith_ingestion::{
    ChapterSegmenter, Chunker, ChunkerConfig, DocumentStore, FsDocumentStore, SegmenterConfig,
};
use quizsmith_llm::{backend_from_config, GenerationSettings, LlmBackend, LlmError, QuizGenerator, ResponseParser};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::stage::PipelineStage;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("embedding backend: {0}")]
    Embed(#[from] EmbedError),
    #[error("generation backend: {0}")]
    Llm(#[from] LlmError),
}

/// Tunables for the per-request pipeline.
#[derive(Debug, Clone, Default)]
pub struct ServiceSettings {
    pub segmentation: SegmenterConfig,
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationSettings,
}

impl From<&Config> for ServiceSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            segmentation: SegmenterConfig::from(&cfg.segmentation),
            chunking: ChunkerConfig::from(&cfg.chunking),
            retrieval: cfg.retrieval.clone(),
            generation: GenerationSettings::from(&cfg.llm),
        }
    }
}

pub struct QuizService {
    store: Arc<dyn DocumentStore>,
    segmenter: ChapterSegmenter,
    chunker: Chunker,
    index_builder: Arc<dyn IndexBuilder>,
    generator: QuizGenerator,
    retrieval: RetrievalConfig,
}

impl QuizService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index_builder: Arc<dyn IndexBuilder>,
        backend: Arc<dyn LlmBackend>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            segmenter: ChapterSegmenter::new(settings.segmentation),
            chunker: Chunker::new(settings.chunking),
            index_builder,
            generator: QuizGenerator::new(backend, settings.generation),
            retrieval: settings.retrieval,
        }
    }

    /// Wire the filesystem store and the configured embedding and generation backends.
    pub async fn from_config(cfg: &Config) -> std::result::Result<Self, SetupError> {
        let store = Arc::new(FsDocumentStore::new(&cfg.documents.root));
        let embedder = embedder_from_config(&cfg.embedding).await?;
        let index_builder = Arc::new(EmbeddingIndexBuilder::new(embedder, cfg.embedding.batch_size));
        let backend = backend_from_config(&cfg.llm)?;
        info!(
            documents = %cfg.documents.root.display(),
            embedding = ?cfg.embedding.backend,
            embedding_model = %cfg.embedding.model_id(),
            llm = ?cfg.llm.backend,
            model = %cfg.llm.model,
            "Quiz service configured"
        );
        Ok(Self::new(store, index_builder, backend, ServiceSettings::from(cfg)))
    }

    /// Run one request through every stage and assemble the quiz.
    #[instrument(
        skip(self, request),
        fields(
            request_id = %Uuid::new_v4(),
            document = %request.document_id,
            chapter = %request.chapter,
            difficulty = %request.difficulty,
            questions = request.question_count,
        )
    )]
    pub async fn generate_quiz(&self, request: QuizRequest) -> Result<QuizResponse> {
        if let Err(e) = request.validate() {
            log_failure(PipelineStage::Received, PipelineStage::Received, &e);
            return Err(e);
        }
        let mut stage = PipelineStage::Received;
        match self.run(&request, &mut stage).await {
            Ok(response) => {
                info!(stage = %PipelineStage::Done, questions = response.questions.len(), "Quiz generated");
                Ok(response)
            }
            Err(e) => {
                log_failure(failed_stage(stage), stage, &e);
                debug!(from = %stage, to = %PipelineStage::Failed, "Stage transition");
                Err(e)
            }
        }
    }

    /// Chapter labels of a stored document, in document order.
    #[instrument(skip(self))]
    pub async fn chapters(&self, document_id: &str) -> Result<Vec<String>> {
        let pages = self.resolve_document(document_id).await?;
        Ok(self.segmenter.segment(&pages).labels())
    }

    /// `stage` holds the last stage reached; on error the failure belongs to its successor.
    async fn run(&self, request: &QuizRequest, stage: &mut PipelineStage) -> Result<QuizResponse> {
        let pages = self.resolve_document(&request.document_id).await?;
        advance(stage, pages.len());

        let chapters = self.segmenter.segment(&pages);
        let (label, range) = resolve_chapter(&chapters, &request.chapter)?;
        debug!(label = %label, range = %range, "Chapter resolved");
        advance(stage, chapters.len());

        let scoped: Vec<Page> = pages.into_iter().filter(|p| range.contains(p.number)).collect();
        let chunks = self.chunker.chunk_pages(&scoped, &chapters);
        let chunk_count = chunks.len();
        let index = self.index_builder.build(chunks).await?;
        advance(stage, chunk_count);

        let query = self.retrieval.query_for(&label);
        let context = retrieve(index.as_ref(), &query, &label, self.retrieval.top_k).await?;
        drop(index);
        advance(stage, context.len());

        let raw = self
            .generator
            .generate(&context, &label, request.question_count, request.difficulty)
            .await?;
        advance(stage, raw.len());

        let questions = ResponseParser::parse(&raw)?;
        advance(stage, questions.len());

        if questions.len() != request.question_count as usize {
            warn!(
                requested = request.question_count,
                received = questions.len(),
                "Model returned a different number of questions"
            );
        }
        Ok(QuizResponse { title: request.title.clone(), questions })
    }

    async fn resolve_document(&self, document_id: &str) -> Result<Vec<Page>> {
        if !self.store.exists(document_id).await {
            return Err(QuizError::NotFound { document_id: document_id.to_string() });
        }
        Ok(self.store.open(document_id).await?)
    }
}

/// Canonical label and page range for a caller-supplied chapter name.
fn resolve_chapter(
    chapters: &ChapterMap,
    requested: &str,
) -> Result<(String, quizsmith_common::PageRange)> {
    chapters
        .find(requested)
        .map(|c| (c.label.clone(), c.pages))
        .ok_or_else(|| QuizError::InvalidChapter {
            requested: requested.to_string(),
            available: chapters.labels(),
        })
}

/// The stage a request was attempting when it failed after completing `completed`.
fn failed_stage(completed: PipelineStage) -> PipelineStage {
    completed.next().unwrap_or(completed)
}

fn log_failure(stage: PipelineStage, completed: PipelineStage, e: &QuizError) {
    if matches!(e, QuizError::Internal(_)) {
        error!(stage = %stage, completed = %completed, error = %e, "Quiz request failed");
    } else {
        warn!(stage = %stage, completed = %completed, kind = e.kind().as_str(), error = %e, "Quiz request failed");
    }
}

fn advance(stage: &mut PipelineStage, items: usize) {
    if let Some(next) = stage.next() {
        debug!(from = %stage, to = %next, items, "Stage transition");
        *stage = next;
    }
}
