//! Query embedding
//!
//! The [`Embedder`] trait is the seam between the pipeline and whatever produces
//! vectors. The production implementation runs the sentence-transformer through
//! ONNX Runtime and is only compiled with `ml-features`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::error::SearchError;

#[cfg(feature = "ml-features")]
pub mod onnx;

#[cfg(feature = "ml-features")]
pub use onnx::OnnxEmbedder;

pub const MODEL_NAME: &str = "sentence-transformers/all-mpnet-base-v2";
pub const EMBEDDING_DIMENSION: usize = 768;

/// Turns query text into a vector comparable with the indexed descriptions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
  /// Embed a single query. Empty text is passed through to the model unchanged.
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError>;

  /// Length of the vectors this embedder produces
  fn dimension(&self) -> usize;

  fn model_name(&self) -> &str;
}

/// Attention-masked mean pooling over the sequence dimension.
///
/// `shape` is `[batch, seq_len, hidden]`; only the first batch row is pooled.
pub fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[u32]) -> Result<Vec<f32>> {
  if shape.len() != 3 {
    return Err(anyhow!("Expected a 3-dimensional hidden state, got shape {:?}", shape));
  }

  let seq_length = shape[1] as usize;
  let hidden_size = shape[2] as usize;

  if data.len() < seq_length * hidden_size {
    return Err(anyhow!(
      "Hidden state has {} values, expected at least {}",
      data.len(),
      seq_length * hidden_size
    ));
  }

  let mut embedding = vec![0.0f32; hidden_size];
  let mut counted = 0.0f32;

  for token_idx in 0..seq_length {
    // Tokens past the end of the mask are treated as attended
    if attention_mask.get(token_idx).copied().unwrap_or(1) == 0 {
      continue;
    }
    let start = token_idx * hidden_size;
    for (i, &value) in data[start..start + hidden_size].iter().enumerate() {
      embedding[i] += value;
    }
    counted += 1.0;
  }

  if counted > 0.0 {
    for value in embedding.iter_mut() {
      *value /= counted;
    }
  }

  Ok(embedding)
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude < f32::EPSILON {
    tracing::warn!("Zero-magnitude embedding detected - returning unchanged");
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}
