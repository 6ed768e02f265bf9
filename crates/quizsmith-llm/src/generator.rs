//! Quiz prompt construction and the single generation call.

use std::sync::Arc;

use quizsmith_common::{Chunk, Difficulty};
use tracing::{info, instrument, warn};

use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { temperature: 0.3, max_tokens: 4096 }
    }
}

impl From<&quizsmith_config::LlmConfig> for GenerationSettings {
    fn from(cfg: &quizsmith_config::LlmConfig) -> Self {
        Self { temperature: cfg.temperature, max_tokens: cfg.max_tokens }
    }
}

pub struct QuizGenerator {
    backend: Arc<dyn LlmBackend>,
    settings: GenerationSettings,
}

impl QuizGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    /// Ask the backend for a quiz over `context` and return its text untouched.
    #[instrument(skip(self, context), fields(model = self.backend.model_id(), context_chunks = context.len()))]
    pub async fn generate(
        &self,
        context: &[Chunk],
        chapter: &str,
        question_count: u32,
        difficulty: Difficulty,
    ) -> Result<String, LlmError> {
        if context.is_empty() {
            warn!(chapter, "Generating with empty context");
        }
        let prompt = build_prompt(context, chapter, question_count, difficulty);
        let req = LlmRequest {
            messages: vec![Message::user(prompt)],
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(self.settings.temperature),
        };
        let resp = self.backend.complete(req).await?;
        info!(
            prompt_tokens = resp.prompt_tokens,
            completion_tokens = resp.completion_tokens,
            "Generation complete"
        );
        Ok(resp.content)
    }
}

/// The full instruction block sent as one user message.
pub fn build_prompt(context: &[Chunk], chapter: &str, question_count: u32, difficulty: Difficulty) -> String {
    let context_text = context
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an expert quiz creator. Your task is to generate a quiz based *only* on the provided context.\n\
         The user wants a quiz for the chapter: \"{chapter}\".\n\
         The quiz must have exactly {question_count} questions at a {difficulty} difficulty level.\n\
         \n\
         Generate the quiz in a valid JSON format. Do not include any other text before or after the JSON.\n\
         The JSON object should have a single key \"questions\", which is a list of question objects.\n\
         Each question object must have:\n\
         1. \"question_text\": The question.\n\
         2. \"options\": A list of exactly 4 distinct strings.\n\
         3. \"correct_answer\": The full text of the correct option, identical to one of the options.\n\
         \n\
         CONTEXT:\n\
         {context_text}\n"
    )
}
