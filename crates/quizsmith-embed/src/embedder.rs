//! Embedder trait, vector helpers, and backend selection from config.

use std::sync::Arc;

use async_trait::async_trait;
use quizsmith_config::{EmbeddingConfig, EmbeddingProvider};

use crate::client::EmbeddingClient;
use crate::error::Result;
use crate::local::LocalEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn name(&self) -> &str;
}

/// Build the embedder selected by `cfg.backend`.
///
/// The local backend loads its model here, so a missing or incompatible
/// model fails at startup rather than on the first request.
pub async fn embedder_from_config(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match cfg.backend {
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::load(cfg).await?),
        _                        => Arc::new(EmbeddingClient::new(cfg.clone())?),
    };
    Ok(embedder)
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-10 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_leaves_zero_vector_alone() {
        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);

        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_remote_backend_without_key_is_rejected() {
        let cfg = EmbeddingConfig { backend: EmbeddingProvider::Openai, ..EmbeddingConfig::default() };
        assert!(embedder_from_config(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn test_ollama_backend_uses_its_default_model() {
        let cfg = EmbeddingConfig { backend: EmbeddingProvider::Ollama, ..EmbeddingConfig::default() };
        let embedder = embedder_from_config(&cfg).await.unwrap();
        assert_eq!(embedder.name(), "nomic-embed-text");
    }
}
