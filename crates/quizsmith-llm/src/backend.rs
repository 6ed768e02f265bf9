//! Generation backend trait and concrete implementations.
//!
//! Backends:
//!   GeminiBackend           : Google Gemini generateContent (gemini-2.5-flash, …)
//!   OpenAiCompatibleBackend : any /v1/chat/completions endpoint (OpenAI,
//!                             Groq, OpenRouter, vLLM, LMStudio, …)
//!   OllamaBackend           : local Ollama through its OpenAI-compatible API
//!
//! Every call is a single non-streaming completion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quizsmith_common::QuizError;
use quizsmith_config::{LlmConfig, LlmProvider};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("backend returned no text: {0}")]
    EmptyResponse(String),
    #[error("backend misconfigured: {0}")]
    Config(String),
}

/// Request URLs are dropped from transport errors; some backends carry
/// credentials in them.
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}

impl From<LlmError> for QuizError {
    fn from(e: LlmError) -> Self {
        QuizError::Upstream(e.to_string())
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
}

/// Build the backend selected by `cfg.backend`.
pub fn backend_from_config(cfg: &LlmConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend: Arc<dyn LlmBackend> = match cfg.backend {
        LlmProvider::Gemini => {
            let key = cfg.api_key.clone().ok_or_else(|| {
                LlmError::Config("Gemini backend requires GEMINI_API_KEY or llm.api_key".to_string())
            })?;
            let mut b = GeminiBackend::new(key, &cfg.model)?;
            if let Some(url) = &cfg.base_url {
                b = b.with_base_url(url);
            }
            Arc::new(b)
        }
        LlmProvider::OpenaiCompatible => Arc::new(OpenAiCompatibleBackend::new(
            cfg.base_url.as_deref().unwrap_or("https://api.openai.com"),
            &cfg.model,
            cfg.api_key.clone(),
        )?),
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(
            cfg.base_url.as_deref().unwrap_or("http://localhost:11434"),
            &cfg.model,
        )?),
    };
    Ok(backend)
}

fn http_client() -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

// ── Helper: parse OpenAI-style response ──────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> Result<LlmResponse, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::EmptyResponse(truncate(&json.to_string())))?
        .to_string();
    Ok(LlmResponse {
        content,
        model: json["model"].as_str().unwrap_or(fallback_model).to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    if status >= 400 {
        let message = body["error"]["message"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| truncate(&text));
        return Err(LlmError::ApiError { status, message });
    }
    if body.is_null() {
        return Err(LlmError::EmptyResponse(truncate(&text)));
    }
    Ok(body)
}

fn truncate(s: &str) -> String {
    s.chars().take(200).collect()
}

fn chat_body(model: &str, req: &LlmRequest) -> serde_json::Value {
    serde_json::json!({
        "model":       model,
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(4096),
        "temperature": req.temperature.unwrap_or(0.3),
        "stream":      false,
    })
}

// ── 1. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: api_key.into(),
            client: http_client()?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_body(req: &LlmRequest) -> serde_json::Value {
        // System message → systemInstruction
        let system_text = req.messages.iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone());

        let contents: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                serde_json::json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": req.max_tokens.unwrap_or(4096),
                "temperature":     req.temperature.unwrap_or(0.3),
            }
        });
        if let Some(sys) = system_text {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": sys }] });
        }
        body
    }

    fn parse_response(json: &serde_json::Value, model: &str) -> Result<LlmResponse, LlmError> {
        let parts = json["candidates"][0]["content"]["parts"].as_array().ok_or_else(|| {
            let reason = json["candidates"][0]["finishReason"]
                .as_str()
                .or_else(|| json["promptFeedback"]["blockReason"].as_str())
                .unwrap_or("no candidates");
            LlmError::EmptyResponse(reason.to_string())
        })?;
        let content: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        Ok(LlmResponse {
            content,
            model: model.to_string(),
            prompt_tokens:     json["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
        })
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let resp = self.client
            .post(&url)
            .header(GEMINI_KEY_HEADER, self.api_key.as_str())
            .json(&Self::request_body(&req))
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Self::parse_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 2. OpenAI-Compatible ──────────────────────────────────────────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: http_client()?,
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = chat_body(&self.model, &req);
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 3. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self { base_url: base_url.into(), model: model.into(), client: http_client()? })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = chat_body(&self.model, &req);
        let resp = self.client.post(&url).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        parse_openai_response(&json, &self.model)
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
