//! Retrieval-augmented generation plumbing
//!
//! Features:
//! - Dense vector search via Qdrant with fail-fast dimension checking
//! - Cross-encoder reranking (ONNX behind the `onnx` feature, deterministic
//!   keyword scorer otherwise)
//! - Ollama embedding client plus a hash embedder for offline use
//! - Plain-text/markdown loader with fixed-size overlapping chunking
//! - YAML/JSON knowledge packs
//! - Document indexer implementing the core `KnowledgeStore` trait
//! - `RetrievalPipeline` implementing the core `Retriever` trait

pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod reranker;
pub mod retriever;
pub mod vector_store;

pub use embeddings::{Embedder, EmbeddingConfig, HashEmbedder, OllamaEmbedder};
pub use ingest::DocumentIndexer;
pub use loader::{DocumentLoader, KnowledgeDocument, KnowledgeFile, LoadedChunk, LoaderConfig};
pub use reranker::{CrossEncoder, KeywordScorer};
pub use retriever::{RetrievalPipeline, RetrieverConfig};
pub use vector_store::{StoredPassage, VectorStore, VectorStoreConfig};

#[cfg(feature = "onnx")]
pub use reranker::OnnxCrossEncoder;

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Dimension mismatch: collection has {collection}, embedder produces {embedder}")]
    DimensionMismatch { collection: usize, embedder: usize },
}

impl From<RagError> for crag_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Index(_) | RagError::Loader(_) => crag_core::Error::Ingest(err.to_string()),
            RagError::DimensionMismatch { .. } => crag_core::Error::Config(err.to_string()),
            _ => crag_core::Error::Retrieval(err.to_string()),
        }
    }
}
