use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use mmrag_core::config::expand_path;
use mmrag_core::{CallError, Embedder};

use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;
use crate::EmbedError;

const MAX_LEN: usize = 256;

struct BgeM3Model {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl BgeM3Model {
    fn load(model_dir: &Path) -> Result<Self, EmbedError> {
        let device = embedding_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::Tokenizer(format!("{}: {e}", tokenizer_path.display())))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| EmbedError::Model(format!("{}: {e}", config_path.display())))?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(hidden_size = config.hidden_size, "BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, hidden_size: config.hidden_size })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if v.len() != self.hidden_size {
            return Err(EmbedError::Shape(format!("embedding has {} dims, expected {}", v.len(), self.hidden_size)));
        }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(v)
    }
}

/// Local BGE-M3 embedder (XLM-RoBERTa backbone, masked mean pooling).
pub struct BgeM3Embedder {
    inner: Arc<BgeM3Model>,
    id: String,
}

impl BgeM3Embedder {
    pub fn load(model_dir: Option<&str>) -> Result<Self, EmbedError> {
        let dir = resolve_model_dir(model_dir)?;
        let inner = Arc::new(BgeM3Model::load(&dir)?);
        let id = format!("bge-m3:d{}", inner.hidden_size);
        Ok(Self { inner, id })
    }
}

#[async_trait]
impl Embedder for BgeM3Embedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.inner.hidden_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CallError> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| inner.embed_text(t)).collect::<Result<Vec<_>, _>>())
            .await
            .map_err(|e| CallError::failed(format!("embedding task panicked: {e}")))?
            .map_err(|e| CallError::failed(e.to_string()))
    }
}

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
fn embedding_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("embedding device: Metal");
            return dev;
        }
    }
    info!("embedding device: CPU");
    Device::Cpu
}

/// Configured directory first, then `APP_MODEL_DIR` / `MODEL_DIR`, then `models/bge-m3`.
fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf, EmbedError> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(["APP_MODEL_DIR", "MODEL_DIR"].into_iter().filter_map(|v| std::env::var(v).ok()).map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3"), PathBuf::from("../models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            return Ok(dir);
        }
    }
    Err(EmbedError::Model("could not locate the BGE-M3 model directory".to_string()))
}
