//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{chunking, endpoints, llm, models, retrieval, screen};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub vector_store: VectorStoreSettings,

    #[serde(default)]
    pub retrieval: RetrievalSettings,

    #[serde(default)]
    pub chunking: ChunkingSettings,

    #[serde(default)]
    pub screen: ScreenSettings,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub model: String,
    pub endpoint: String,
    /// Context window cap (tokens)
    pub num_ctx: usize,
    /// Answer length cap (tokens)
    pub num_predict: usize,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: models::LLM_MODEL.to_string(),
            endpoint: endpoints::OLLAMA_DEFAULT.to_string(),
            num_ctx: llm::NUM_CTX,
            num_predict: llm::NUM_PREDICT,
            temperature: 0.1,
            timeout_secs: llm::REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Embedding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub model: String,
    pub endpoint: String,
    /// Must match the vector store dimension exactly
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: models::EMBEDDING_MODEL.to_string(),
            endpoint: endpoints::OLLAMA_DEFAULT.to_string(),
            dim: retrieval::EMBEDDING_DIM,
        }
    }
}

/// Vector store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreSettings {
    pub endpoint: String,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: retrieval::COLLECTION_NAME.to_string(),
            api_key: None,
        }
    }
}

/// Retrieval and confidence-gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Nearest neighbors fetched from the vector index
    pub top_k: usize,
    /// Passages kept after reranking
    pub rerank_top_n: usize,
    /// Gate threshold on the top rerank score
    pub confidence_threshold: f32,
    /// Enable the cross-encoder rerank stage
    pub rerank_enabled: bool,
    /// Reject passages whose top score is absent instead of accepting them.
    /// The lenient default mirrors the reference behavior; flip this to
    /// treat unscored evidence like empty evidence.
    pub reject_unscored: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: retrieval::DENSE_TOP_K,
            rerank_top_n: retrieval::RERANK_TOP_N,
            confidence_threshold: retrieval::CONFIDENCE_THRESHOLD,
            rerank_enabled: true,
            reject_unscored: false,
        }
    }
}

/// Document chunking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: chunking::CHUNK_SIZE,
            overlap: chunking::CHUNK_OVERLAP,
        }
    }
}

/// Hallucination screen settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSettings {
    /// Answers at or below this length always pass
    pub max_unscreened_len: usize,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            max_unscreened_len: screen::MAX_UNSCREENED_LEN,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dim == 0 {
            return Err(ConfigError::InvalidValue {
                field: "embedding.dim".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(ConfigError::InvalidValue {
                field: "chunking.overlap".to_string(),
                message: format!(
                    "overlap {} must be smaller than chunk size {}",
                    self.chunking.overlap, self.chunking.chunk_size
                ),
            });
        }
        if !self.retrieval.confidence_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.confidence_threshold".to_string(),
                message: "must be finite".to_string(),
            });
        }
        if self.retrieval.rerank_top_n > self.retrieval.top_k {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.rerank_top_n".to_string(),
                message: "cannot exceed retrieval.top_k".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from an optional file plus `CRAG_*` environment overrides
///
/// Missing file is fine; defaults apply. `CRAG_LLM__MODEL=phi3:mini` style
/// variables override nested fields.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(Environment::with_prefix("CRAG").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        model = %settings.llm.model,
        collection = %settings.vector_store.collection,
        "Settings loaded"
    );

    Ok(settings)
}
