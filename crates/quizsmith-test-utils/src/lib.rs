//! Shared testing utilities for the quizsmith workspace.
//!
//! In-memory stand-ins for the three collaborators a quiz request touches
//! (document store, embedder, generation backend) plus page fixtures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use quizsmith_common::Page;
use quizsmith_embed::{EmbedError, Embedder};
use quizsmith_ingestion::{DocumentStore, IngestionError};
use quizsmith_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

pub use pretty_assertions::{assert_eq, assert_ne};

// ── Page fixtures ─────────────────────────────────────────────────────────────

/// `total` pages of body text with the given `(page, first line)` markers.
pub fn pages_with_markers(total: u32, markers: &[(u32, &str)]) -> Vec<Page> {
    (1..=total)
        .map(|n| {
            let body = format!(
                "Page {n} discusses membranes, organelles, genes and inheritance in detail. \
                 Students should review the figures on page {n}."
            );
            let text = match markers.iter().find(|(p, _)| *p == n) {
                Some((_, title)) => format!("{title}\n{body}"),
                None => body,
            };
            Page::new(n, text)
        })
        .collect()
}

/// Ten pages with "Chapter 1: Cells" on page 1 and "Chapter 2: Genetics" on page 6.
pub fn bio101_pages() -> Vec<Page> {
    pages_with_markers(10, &[(1, "Chapter 1: Cells"), (6, "Chapter 2: Genetics")])
}

/// A well-formed quiz payload with `n` questions.
pub fn quiz_json(n: usize) -> String {
    let questions: Vec<serde_json::Value> = (1..=n)
        .map(|i| {
            serde_json::json!({
                "question_text": format!("Question {i}?"),
                "options": [format!("A{i}"), format!("B{i}"), format!("C{i}"), format!("D{i}")],
                "correct_answer": format!("A{i}"),
            })
        })
        .collect();
    serde_json::json!({ "questions": questions }).to_string()
}

// ── Document store ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: HashMap<String, Vec<Page>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: impl Into<String>, pages: Vec<Page>) -> Self {
        self.docs.insert(id.into(), pages);
        self
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(&self, document_id: &str) -> bool {
        self.docs.contains_key(document_id)
    }

    async fn open(&self, document_id: &str) -> Result<Vec<Page>, IngestionError> {
        self.docs
            .get(document_id)
            .cloned()
            .ok_or_else(|| IngestionError::DocumentNotFound(document_id.to_string()))
    }
}

// ── Embedder ──────────────────────────────────────────────────────────────────

/// Always fails as if the embedding service were down.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Api { status: 503, message: "embedding service unreachable".to_string() })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// ── Generation backend ────────────────────────────────────────────────────────

/// Generation backend with a fixed reply (or failure) that records every prompt.
pub struct ScriptedLlm {
    reply: Result<String, (u16, String)>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn replying(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()), prompts: Mutex::new(Vec::new()), calls: AtomicUsize::new(0) }
    }

    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            reply: Err((status, message.into())),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Concatenated message contents of each call, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = req.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }
        match &self.reply {
            Ok(text) => Ok(LlmResponse {
                content: text.clone(),
                model: "scripted".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
            Err((status, message)) => Err(LlmError::ApiError { status: *status, message: message.clone() }),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }
}
