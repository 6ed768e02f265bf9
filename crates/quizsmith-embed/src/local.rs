//! Local sentence embeddings with Candle.
//!
//! Loads a BERT-family sentence-transformers checkpoint from the Hugging Face
//! Hub (`sentence-transformers/all-MiniLM-L6-v2` unless configured otherwise),
//! runs it on the CPU, mean-pools token states over the attention mask and
//! L2-normalizes the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use quizsmith_config::EmbeddingConfig;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, instrument};

use crate::embedder::Embedder;
use crate::error::{EmbedError, Result};
use crate::pooling::{mean_pool, normalize_rows};

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

struct SentenceModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

pub struct LocalEmbedder {
    inner: Arc<SentenceModel>,
    model_id: String,
    batch_size: usize,
}

impl LocalEmbedder {
    /// Download (or reuse the hub cache) and load the configured model.
    ///
    /// Fails when the model's hidden size differs from `cfg.dim`.
    pub async fn load(cfg: &EmbeddingConfig) -> Result<Self> {
        let start = Instant::now();
        let model_id = cfg.model_id().to_string();
        let max_length = cfg.max_length;
        let expected_dim = cfg.dim;
        info!(model = %model_id, "Loading local embedding model");

        let repo_id = model_id.clone();
        let inner = tokio::task::spawn_blocking(move || {
            let files = fetch_model_files(&repo_id)?;
            SentenceModel::load(&files, max_length, expected_dim)
        })
        .await
        .map_err(|e| EmbedError::Model(format!("model load task: {e}")))??;

        info!(model = %model_id, elapsed_ms = start.elapsed().as_millis() as u64, "Local embedding model ready");
        Ok(Self { inner: Arc::new(inner), model_id, batch_size: cfg.batch_size.max(1) })
    }
}

fn fetch_model_files(repo_id: &str) -> Result<ModelFiles> {
    let api = Api::new().map_err(|e| EmbedError::Model(format!("hub init: {e}")))?;
    let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));
    let get = |file: &str| repo.get(file).map_err(|e| EmbedError::Model(format!("{repo_id}/{file}: {e}")));

    let config = get("config.json")?;
    let tokenizer = get("tokenizer.json")?;
    let weights = get("model.safetensors").or_else(|_| get("pytorch_model.bin"))?;
    debug!(weights = %weights.display(), "Model files available");
    Ok(ModelFiles { config, tokenizer, weights })
}

impl SentenceModel {
    fn load(files: &ModelFiles, max_length: usize, expected_dim: usize) -> Result<Self> {
        let device = Device::Cpu;
        let config = read_config(&files.config)?;
        if config.hidden_size != expected_dim {
            return Err(EmbedError::Config(format!(
                "model produces {}-dimensional vectors but embedding.dim is {}",
                config.hidden_size, expected_dim
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer.with_truncation(Some(TruncationParams { max_length, ..Default::default() }))?;

        let is_safetensors = files.weights.extension().is_some_and(|e| e == "safetensors");
        let vb = if is_safetensors {
            // The hub cache file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)? }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;
        Ok(Self { model, tokenizer, device })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self.tokenizer.encode_batch(inputs, true)?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::stack(&masks, 0)?.to_dtype(DType::F32)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = normalize_rows(&mean_pool(&hidden, &attention_mask)?)?;
        Ok(pooled.to_vec2::<f32>()?)
    }
}

fn read_config(path: &Path) -> Result<BertConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EmbedError::Model(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| EmbedError::Model(format!("config.json: {e}")))
}

#[async_trait]
impl Embedder for LocalEmbedder {
    #[instrument(skip(self, texts), fields(n = texts.len(), model = %self.model_id))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let model = Arc::clone(&self.inner);
            let batch = batch.to_vec();
            let vectors = tokio::task::spawn_blocking(move || model.embed_batch(&batch))
                .await
                .map_err(|e| EmbedError::Model(format!("inference task: {e}")))??;
            out.extend(vectors);
        }
        debug!(vectors = out.len(), elapsed_ms = start.elapsed().as_millis() as u64, "Embedded texts");
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}
