//! Text embeddings
//!
//! The pipeline talks to an embedding service through the [`Embedder`]
//! trait. `OllamaEmbedder` is the production client; `HashEmbedder` is a
//! deterministic feature-hash embedder for tests and offline development.
//! Whatever the implementation, its dimension must match the vector store
//! collection exactly; the store verifies this at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::RagError;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Service endpoint
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Output vector dimension
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: crag_config::constants::endpoints::OLLAMA_DEFAULT.to_string(),
            model: crag_config::constants::models::EMBEDDING_MODEL.to_string(),
            dim: crag_config::constants::retrieval::EMBEDDING_DIM,
        }
    }
}

impl From<&crag_config::EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &crag_config::EmbeddingSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            dim: settings.dim,
        }
    }
}

/// Embedding service seam
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    /// Map text to a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed multiple texts
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Output dimension, checked against the vector store at startup
    fn dim(&self) -> usize;
}

/// Ollama embedding client
pub struct OllamaEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };

        let url = format!("{}/api/embed", self.config.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Embedding service failed: {} - {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        let embedding = embed_response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))?;

        if embedding.len() != self.config.dim {
            return Err(RagError::DimensionMismatch {
                collection: self.config.dim,
                embedder: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dim(&self) -> usize {
        self.config.dim
    }
}

/// Deterministic feature-hash embedder
///
/// Not semantically meaningful; identical texts map to identical vectors and
/// token overlap produces vector overlap, which is enough for tests and
/// offline development without an embedding service.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn hash_token(token: &str) -> u64 {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vector = vec![0.0f32; self.dim];

        for token in text.to_lowercase().split_whitespace() {
            let hash = Self::hash_token(token);
            let index = (hash % self.dim as u64) as usize;
            // Sign from an independent hash bit keeps buckets from only accumulating
            let sign = if hash & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
