use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::Api;
use ndarray::Array2;
use ort::{
  execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
  session::Session,
  value::Value,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};

use super::{mean_pool, normalize, Embedder, EMBEDDING_DIMENSION, MODEL_NAME};
use crate::error::SearchError;

const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILE: &str = "onnx/model.onnx";
const MAX_SEQUENCE_LENGTH: usize = 384; // all-mpnet-base-v2 max_seq_length

/// Tensor lookup on model outputs - lets extraction be tested without a session
trait EmbeddingOutput {
  fn get_tensor(&self, key: &str) -> Option<&dyn TensorData>;
}

trait TensorData {
  fn extract_f32_data(&self) -> Result<(&[i64], &[f32])>;
}

trait SessionInputs {
  fn input_names(&self) -> Vec<String>;
}

#[cfg(not(tarpaulin_include))]
impl<'s> EmbeddingOutput for ort::session::SessionOutputs<'s> {
  fn get_tensor(&self, key: &str) -> Option<&dyn TensorData> {
    self.get(key).map(|v| v as &dyn TensorData)
  }
}

#[cfg(not(tarpaulin_include))]
impl TensorData for ort::value::Value {
  fn extract_f32_data(&self) -> Result<(&[i64], &[f32])> {
    let (shape, data) = self.try_extract_tensor::<f32>()?;
    Ok((shape.as_ref(), data))
  }
}

#[cfg(not(tarpaulin_include))]
impl SessionInputs for Session {
  fn input_names(&self) -> Vec<String> {
    self.inputs.iter().map(|input| input.name.to_string()).collect()
  }
}

/// Sentence-transformer run locally through ONNX Runtime.
///
/// Cheap to clone; clones share the loaded session.
#[derive(Clone)]
pub struct OnnxEmbedder {
  session: Arc<Mutex<Session>>,
  tokenizer: Arc<Tokenizer>,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEmbedder {
  /// Download (or reuse the cached copy of) the model and build an inference session
  pub async fn load() -> Result<Self> {
    tracing::info!(model = MODEL_NAME, "loading embedding model");

    let model_files = Self::download_model().await?;
    let tokenizer = Self::load_tokenizer(model_files.tokenizer_file)?;
    let session = Self::load_model(model_files.model_path)?;

    tracing::info!(model = MODEL_NAME, "embedding model ready");
    Ok(Self { session: Arc::new(Mutex::new(session)), tokenizer: Arc::new(tokenizer) })
  }

  async fn download_model() -> Result<ModelFiles> {
    let api = Api::new().map_err(|e| anyhow!("HF API initialization failed: {}", e))?;
    let repo = api.model(MODEL_NAME.to_string());

    let tokenizer_file =
      repo.get(TOKENIZER_FILE).await.map_err(|e| anyhow!("Failed to download tokenizer: {}", e))?;

    let model_path =
      repo.get(MODEL_FILE).await.map_err(|e| anyhow!("Failed to download ONNX model: {}", e))?;

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn load_tokenizer(path: PathBuf) -> Result<Tokenizer> {
    let mut tokenizer =
      Tokenizer::from_file(path).map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

    tokenizer
      .with_truncation(Some(TruncationParams {
        max_length: MAX_SEQUENCE_LENGTH,
        ..Default::default()
      }))
      .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

    Ok(tokenizer)
  }

  fn load_model(model_path: PathBuf) -> Result<Session> {
    let providers: Vec<ExecutionProviderDispatch> = vec![CPUExecutionProvider::default().into()];

    let session =
      Session::builder()?.with_execution_providers(providers)?.commit_from_file(model_path)?;

    Ok(session)
  }
}

// Inference
impl OnnxEmbedder {
  #[cfg(not(tarpaulin_include))]
  fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
    let encoding =
      self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let attention_mask = encoding.get_attention_mask().to_vec();

    let mut session =
      self.session.lock().map_err(|_| anyhow!("Embedding session lock poisoned"))?;

    let input = Self::prepare(
      encoding.get_ids(),
      &attention_mask,
      encoding.get_type_ids(),
      &*session,
    )?;
    let output = session.run(input)?;
    let pooled = Self::extract_embedding(&output, &attention_mask)?;

    Ok(normalize(pooled))
  }

  fn prepare(
    ids: &[u32],
    attention_mask: &[u32],
    type_ids: &[u32],
    session: &dyn SessionInputs,
  ) -> Result<HashMap<String, Value>> {
    let mut input = HashMap::new();
    input.insert("input_ids".to_string(), Self::to_tensor(ids)?);
    input.insert("attention_mask".to_string(), Self::to_tensor(attention_mask)?);

    // mpnet exports omit token_type_ids; only send it when the graph asks
    if session.input_names().iter().any(|name| name == "token_type_ids") {
      input.insert("token_type_ids".to_string(), Self::to_tensor(type_ids)?);
    }

    Ok(input)
  }

  fn to_tensor(values: &[u32]) -> Result<Value> {
    let array: Array2<i64> =
      Array2::from_shape_vec((1, values.len()), values.iter().map(|&x| x as i64).collect())?;
    let tensor: Value = Value::from_array(array)?.into();
    Ok(tensor)
  }

  fn extract_embedding(output: &dyn EmbeddingOutput, attention_mask: &[u32]) -> Result<Vec<f32>> {
    let tensor = output
      .get_tensor("last_hidden_state")
      .or_else(|| output.get_tensor("token_embeddings"))
      .ok_or_else(|| {
        anyhow!("No output found from model - expected 'last_hidden_state' or 'token_embeddings'")
      })?;

    let (shape, data) = tensor.extract_f32_data()?;
    mean_pool(shape, data, attention_mask)
  }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError> {
    let embedder = self.clone();
    let text = text.to_string();

    tokio::task::spawn_blocking(move || embedder.embed_blocking(&text))
      .await
      .map_err(|e| SearchError::Embedding(format!("inference task failed: {e}")))?
      .map_err(|e| SearchError::Embedding(e.to_string()))
  }

  fn dimension(&self) -> usize {
    EMBEDDING_DIMENSION
  }

  fn model_name(&self) -> &str {
    MODEL_NAME
  }
}
