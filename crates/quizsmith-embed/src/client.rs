//! HTTP embedding client for the remote backends.
//!
//! Supports:
//!   - Gemini         (batchEmbedContents, text-embedding-004)
//!   - OpenAI         (text-embedding-3-small / -large)
//!   - OpenAI-compat  (any /v1/embeddings endpoint)
//!   - Ollama         (/api/embeddings, one text per call)
//!
//! Texts are sent in `batch_size` groups and every returned vector is
//! L2-normalized. A response with the wrong number of vectors, or vectors of
//! differing length, is rejected rather than padded.

use std::time::Duration;

use async_trait::async_trait;
use quizsmith_config::{EmbeddingConfig, EmbeddingProvider};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::embedder::{l2_normalize, Embedder};
use crate::error::{EmbedError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

pub struct EmbeddingClient {
    cfg: EmbeddingConfig,
    client: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(cfg: EmbeddingConfig) -> Result<Self> {
        match cfg.backend {
            EmbeddingProvider::Local => {
                return Err(EmbedError::Config("local backend does not use the HTTP client".to_string()));
            }
            EmbeddingProvider::Gemini | EmbeddingProvider::Openai if cfg.api_key.is_none() => {
                return Err(EmbedError::Config(format!("{:?} embedding backend requires an API key", cfg.backend)));
            }
            _ => {}
        }
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { cfg, client })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.cfg.backend {
            EmbeddingProvider::Gemini           => self.embed_gemini(texts).await,
            EmbeddingProvider::Openai           => self.embed_openai(texts).await,
            EmbeddingProvider::OpenaiCompatible => self.embed_compat(texts).await,
            EmbeddingProvider::Ollama           => self.embed_ollama(texts).await,
            EmbeddingProvider::Local            => Err(EmbedError::Config("local backend reached HTTP client".to_string())),
        }
    }

    fn api_key(&self) -> &str {
        self.cfg.api_key.as_deref().unwrap_or("")
    }

    // ── Gemini ─────────────────────────────────────────────────────────────

    async fn embed_gemini(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com")
            .trim_end_matches('/');
        let url = format!("{}/v1beta/models/{}:batchEmbedContents", base, self.cfg.model_id());
        let requests: Vec<Value> = texts.iter().map(|t| serde_json::json!({
            "model": format!("models/{}", self.cfg.model_id()),
            "content": { "parts": [{ "text": t }] }
        })).collect();

        let resp = self.client
            .post(&url)
            .header(GEMINI_KEY_HEADER, self.api_key())
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_gemini_embeddings(&json)
    }

    // ── OpenAI ─────────────────────────────────────────────────────────────

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        let body = serde_json::json!({ "model": self.cfg.model_id(), "input": texts });
        let resp = self.client
            .post(format!("{}/v1/embeddings", base))
            .bearer_auth(self.api_key())
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        parse_openai_embeddings(&json)
    }

    // ── OpenAI-compatible ──────────────────────────────────────────────────

    async fn embed_compat(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("http://localhost:8080")
            .trim_end_matches('/');
        let body = serde_json::json!({ "model": self.cfg.model_id(), "input": texts });
        let mut req = self.client.post(format!("{}/v1/embeddings", base)).json(&body);
        if let Some(ref k) = self.cfg.api_key {
            req = req.bearer_auth(k);
        }
        let json = check_response_status(req.send().await?).await?;
        parse_openai_embeddings(&json)
    }

    // ── Ollama ─────────────────────────────────────────────────────────────

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let base = self.cfg.base_url.as_deref()
            .unwrap_or("http://localhost:11434")
            .trim_end_matches('/');
        let url = format!("{}/api/embeddings", base);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({ "model": self.cfg.model_id(), "prompt": text });
            let resp = self.client.post(&url).json(&body).send().await?;
            let json = check_response_status(resp).await?;
            out.push(to_vector(&json["embedding"])?);
        }
        Ok(out)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = ?self.cfg.backend))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.cfg.batch_size.max(1)) {
            let mut vectors = self.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::InvalidResponse(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            vectors.iter_mut().for_each(|v| l2_normalize(v));
            out.extend(vectors);
        }
        check_uniform_dim(&out)?;
        debug!(vectors = out.len(), "Embedded texts");
        Ok(out)
    }

    fn name(&self) -> &str {
        self.cfg.model_id()
    }
}

// ── Response helpers ──────────────────────────────────────────────────────────

async fn check_response_status(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
    if status >= 400 {
        let message = body["error"]["message"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(EmbedError::Api { status, message });
    }
    if body.is_null() {
        return Err(EmbedError::InvalidResponse("response body is not JSON".to_string()));
    }
    Ok(body)
}

fn parse_openai_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    json["data"]
        .as_array()
        .ok_or_else(|| EmbedError::InvalidResponse("missing `data` array".to_string()))?
        .iter()
        .map(|item| to_vector(&item["embedding"]))
        .collect()
}

fn parse_gemini_embeddings(json: &Value) -> Result<Vec<Vec<f32>>> {
    json["embeddings"]
        .as_array()
        .ok_or_else(|| EmbedError::InvalidResponse("missing `embeddings` array".to_string()))?
        .iter()
        .map(|item| to_vector(&item["values"]))
        .collect()
}

fn to_vector(value: &Value) -> Result<Vec<f32>> {
    let values = value
        .as_array()
        .ok_or_else(|| EmbedError::InvalidResponse("embedding is not an array".to_string()))?;
    if values.is_empty() {
        return Err(EmbedError::InvalidResponse("empty embedding".to_string()));
    }
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbedError::InvalidResponse(format!("non-numeric component: {v}")))
        })
        .collect()
}

fn check_uniform_dim(vectors: &[Vec<f32>]) -> Result<()> {
    if let Some(first) = vectors.first() {
        if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(EmbedError::InvalidResponse(format!(
                "mixed embedding dimensions: {} and {}",
                first.len(),
                bad.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quizsmith_common::QuizError;
    use serde_json::json;

    #[test]
    fn test_parse_openai_embeddings() {
        let resp = json!({
            "data": [
                { "index": 0, "embedding": [0.1, 0.2] },
                { "index": 1, "embedding": [0.3, 0.4] }
            ],
            "model": "text-embedding-3-small"
        });
        let vecs = parse_openai_embeddings(&resp).unwrap();
        assert_eq!(vecs, vec![vec![0.1f32, 0.2], vec![0.3f32, 0.4]]);
    }

    #[test]
    fn test_parse_gemini_embeddings() {
        let resp = json!({ "embeddings": [ { "values": [1.0, 0.0, 0.0] } ] });
        let vecs = parse_gemini_embeddings(&resp).unwrap();
        assert_eq!(vecs, vec![vec![1.0f32, 0.0, 0.0]]);
    }

    #[test]
    fn test_missing_array_is_invalid_response() {
        let err = parse_openai_embeddings(&json!({ "object": "list" })).unwrap_err();
        assert!(matches!(err, EmbedError::InvalidResponse(_)));
    }

    #[test]
    fn test_non_numeric_component_is_rejected() {
        let err = to_vector(&json!([0.5, "x"])).unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
    }

    #[test]
    fn test_mixed_dimensions_are_rejected() {
        assert!(check_uniform_dim(&[vec![1.0, 0.0], vec![1.0]]).is_err());
        assert!(check_uniform_dim(&[]).is_ok());
    }

    #[test]
    fn test_gemini_client_requires_key() {
        let cfg = EmbeddingConfig { backend: EmbeddingProvider::Gemini, ..EmbeddingConfig::default() };
        assert!(matches!(EmbeddingClient::new(cfg), Err(EmbedError::Config(_))));
    }

    #[test]
    fn test_ollama_client_needs_no_key() {
        let cfg = EmbeddingConfig {
            backend: EmbeddingProvider::Ollama,
            ..EmbeddingConfig::default()
        };
        let client = EmbeddingClient::new(cfg).unwrap();
        assert_eq!(client.name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_gemini_transport_error_does_not_carry_key() {
        let cfg = EmbeddingConfig {
            backend: EmbeddingProvider::Gemini,
            base_url: Some("http://127.0.0.1:1".to_string()),
            api_key: Some("SECRET_KEY_123".to_string()),
            ..EmbeddingConfig::default()
        };
        let client = EmbeddingClient::new(cfg).unwrap();
        let err: QuizError = client.embed(&["cells".to_string()]).await.unwrap_err().into();
        assert!(matches!(err, QuizError::ServiceUnavailable(_)));
        assert!(!err.to_string().contains("SECRET_KEY_123"), "key leaked: {err}");
    }
}
