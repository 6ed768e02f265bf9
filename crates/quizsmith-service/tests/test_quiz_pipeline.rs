//! End-to-end quiz requests against in-memory collaborators.
//!
//! ```bash
//! cargo test --package quizsmith-service --test test_quiz_pipeline
//! ```

use std::sync::Arc;

use quizsmith_common::{Difficulty, ErrorKind, MalformedKind, QuizError, QuizRequest};
use quizsmith_embed::{EmbeddingIndexBuilder, HashingEmbedder};
use quizsmith_service::{QuizService, ServiceSettings};
use quizsmith_test_utils::{
    assert_eq, bio101_pages, pages_with_markers, quiz_json, FailingEmbedder, InMemoryDocumentStore, ScriptedLlm,
};

const FENCED_REPLY: &str =
    "```json\n{\"questions\":[{\"question_text\":\"Q\",\"options\":[\"A\",\"B\",\"C\",\"D\"],\"correct_answer\":\"A\"}]}\n```";

fn service_with(llm: Arc<ScriptedLlm>) -> QuizService {
    let store = InMemoryDocumentStore::new()
        .with_document("bio101.pdf", bio101_pages())
        .with_document("notes.pdf", pages_with_markers(3, &[]));
    let builder = EmbeddingIndexBuilder::new(Arc::new(HashingEmbedder::new(256)), 8);
    QuizService::new(Arc::new(store), Arc::new(builder), llm, ServiceSettings::default())
}

fn request(document_id: &str, chapter: &str, count: u32) -> QuizRequest {
    QuizRequest {
        document_id: document_id.to_string(),
        chapter: chapter.to_string(),
        difficulty: Difficulty::Medium,
        question_count: count,
        title: "Biology check".to_string(),
        description: None,
    }
}

#[tokio::test]
async fn test_bio101_lists_both_chapters() {
    let service = service_with(Arc::new(ScriptedLlm::replying(quiz_json(1))));
    let labels = service.chapters("bio101.pdf").await.unwrap();
    assert_eq!(labels, vec!["Chapter 1: Cells", "Chapter 2: Genetics"]);
}

#[tokio::test]
async fn test_fenced_reply_becomes_one_question_quiz() {
    let llm = Arc::new(ScriptedLlm::replying(FENCED_REPLY));
    let service = service_with(llm.clone());

    let quiz = service.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 1)).await.unwrap();
    assert_eq!(quiz.title, "Biology check");
    assert_eq!(quiz.questions.len(), 1);
    assert_eq!(quiz.questions[0].options, vec!["A", "B", "C", "D"]);
    assert_eq!(quiz.questions[0].correct_answer, "A");
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_context_comes_only_from_requested_chapter() {
    let llm = Arc::new(ScriptedLlm::replying(quiz_json(2)));
    let service = service_with(llm.clone());

    service.generate_quiz(request("bio101.pdf", " chapter 2: genetics ", 2)).await.unwrap();

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("\"Chapter 2: Genetics\""), "prompt should name the canonical label");
    assert!(prompt.contains("exactly 2 questions"));
    let context = prompt.split("CONTEXT:").nth(1).unwrap();
    assert!(context.contains("Page 6 discusses") || context.contains("Page 7 discusses"));
    for page in 1..=5 {
        assert!(!context.contains(&format!("Page {page} discusses")), "page {page} leaked into context");
    }
}

#[tokio::test]
async fn test_unknown_chapter_lists_available_labels() {
    let llm = Arc::new(ScriptedLlm::replying(quiz_json(1)));
    let service = service_with(llm.clone());

    let err = service.generate_quiz(request("bio101.pdf", "Chapter 3", 1)).await.unwrap_err();
    match err {
        QuizError::InvalidChapter { requested, available } => {
            assert_eq!(requested, "Chapter 3");
            assert_eq!(available, vec!["Chapter 1: Cells", "Chapter 2: Genetics"]);
        }
        other => panic!("expected InvalidChapter, got {other:?}"),
    }
    assert_eq!(llm.calls(), 0, "generation must not run for an invalid chapter");
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let service = service_with(Arc::new(ScriptedLlm::replying(quiz_json(1))));
    let err = service.generate_quiz(request("chem201.pdf", "Chapter 1", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(service.chapters("chem201.pdf").await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unmarked_document_uses_full_document_chapter() {
    let service = service_with(Arc::new(ScriptedLlm::replying(quiz_json(3))));
    assert_eq!(service.chapters("notes.pdf").await.unwrap(), vec!["Full Document"]);
    let quiz = service.generate_quiz(request("notes.pdf", "full document", 3)).await.unwrap();
    assert_eq!(quiz.questions.len(), 3);
}

#[tokio::test]
async fn test_embedding_outage_is_service_unavailable() {
    let store = InMemoryDocumentStore::new().with_document("bio101.pdf", bio101_pages());
    let builder = EmbeddingIndexBuilder::new(Arc::new(FailingEmbedder), 8);
    let llm = Arc::new(ScriptedLlm::replying(quiz_json(1)));
    let service = QuizService::new(Arc::new(store), Arc::new(builder), llm.clone(), ServiceSettings::default());

    let err = service.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert!(err.is_retryable());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_is_upstream_error() {
    let service = service_with(Arc::new(ScriptedLlm::failing(500, "model overloaded")));
    let err = service.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert!(err.to_string().contains("model overloaded"));
}

#[tokio::test]
async fn test_prose_reply_is_malformed_with_raw_text() {
    let reply = "I'm sorry, I can only write three questions.";
    let service = service_with(Arc::new(ScriptedLlm::replying(reply)));
    let err = service.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 5)).await.unwrap_err();
    match err {
        QuizError::MalformedResponse { kind, raw, .. } => {
            assert_eq!(kind, MalformedKind::Syntax);
            assert_eq!(raw, reply);
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_question_request_is_rejected_before_any_work() {
    let llm = Arc::new(ScriptedLlm::replying(quiz_json(1)));
    let service = service_with(llm.clone());
    let err = service.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let llm = Arc::new(ScriptedLlm::replying(quiz_json(2)));
    let service = Arc::new(service_with(llm.clone()));

    let a = tokio::spawn({
        let s = service.clone();
        async move { s.generate_quiz(request("bio101.pdf", "Chapter 1: Cells", 2)).await }
    });
    let b = tokio::spawn({
        let s = service.clone();
        async move { s.generate_quiz(request("bio101.pdf", "Chapter 2: Genetics", 2)).await }
    });
    assert_eq!(a.await.unwrap().unwrap().questions.len(), 2);
    assert_eq!(b.await.unwrap().unwrap().questions.len(), 2);
    assert_eq!(llm.calls(), 2);
}
