use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{info, warn};

use clinrag_core::config::{expand_path, EmbeddingSettings, Pooling};
use clinrag_core::error::Error;
use clinrag_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::{cls_l2, masked_mean_l2};

/// BERT-family sentence embedder (BGE small/base) running on candle.
pub struct BgeEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, pooling: Pooling }

impl BgeEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let device = device::select_device();
        let model_dir = expand_path(&settings.model_dir);
        if !model_dir.is_dir() { return Err(Error::NotFound(format!("embedding model directory {}", model_dir.display())).into()); }
        info!(model_dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let vb = load_weights(&model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        info!(dim = settings.dim, pooling = ?settings.pooling, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim: settings.dim, max_len: settings.max_len, pooling: settings.pooling })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask, token_type_ids) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Tensor = match self.pooling {
            Pooling::Cls => cls_l2(&hidden)?,
            Pooling::Mean => masked_mean_l2(&hidden, &attention_mask)?,
        };
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { bail!("model produced {}-dim vectors but embedding.dim is {}", emb.len(), self.dim); }
        if start.elapsed().as_millis() > 100 { warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let pth = model_dir.join("pytorch_model.bin");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else if pth.exists() {
        candle_core::pickle::read_all(&pth)?.into_iter().collect()
    } else {
        bail!("no model.safetensors or pytorch_model.bin in {}", model_dir.display())
    };
    Ok(VarBuilder::from_tensors(tensors, DTYPE, device))
}

impl Embedder for BgeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { texts.iter().map(|t| self.embed_text(t)).collect() }
}

/// Deterministic bag-of-tokens embedder: each lower-cased token is hashed
/// into one bucket. Texts sharing tokens get positive cosine similarity.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder { pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } } }

impl FakeEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0); token.to_lowercase().hash(&mut hasher); let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize; v[idx] += 1.0 + (((h >> 32) as u32) as f32 / u32::MAX as f32) * 0.1;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if settings.fake || env_fake { info!(dim = settings.dim, "using FakeEmbedder"); return Ok(Box::new(FakeEmbedder::new(settings.dim))); }
    Ok(Box::new(BgeEmbedder::new(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_safetensors_weights() {
        let dir = tempfile::tempdir().expect("tmp");
        let weight = Tensor::arange(0f32, 6f32, &Device::Cpu).and_then(|t| t.reshape((2, 3))).expect("tensor");
        let tensors = HashMap::from([("pooler.dense.weight".to_string(), weight)]);
        candle_core::safetensors::save(&tensors, dir.path().join("model.safetensors")).expect("save");

        let vb = load_weights(dir.path(), &Device::Cpu).expect("load");
        let loaded = vb.get((2, 3), "pooler.dense.weight").expect("weight");
        assert_eq!(loaded.to_vec2::<f32>().expect("values"), vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
    }

    #[test]
    fn missing_weight_files_are_reported() {
        let dir = tempfile::tempdir().expect("tmp");
        let err = load_weights(dir.path(), &Device::Cpu).err().expect("no weights present");
        assert!(err.to_string().contains("no model.safetensors"), "got {err}");
    }
}
