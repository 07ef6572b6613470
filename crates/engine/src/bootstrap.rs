//! Production wiring
//!
//! Builds a ready-to-serve [`AnswerPipeline`] from loaded settings: Ollama
//! backend, embedding client, Qdrant store, reranker and indexer, all
//! injected through the core trait seams. Hosting shells call this once at
//! startup; tests build their own pipelines with stub services instead.

use std::sync::Arc;

use crag_config::Settings;
use crag_core::Error;
use crag_llm::{LlmConfig, OllamaBackend};
use crag_rag::{
    DocumentIndexer, EmbeddingConfig, LoaderConfig, OllamaEmbedder, RetrievalPipeline,
    RetrieverConfig, VectorStore, VectorStoreConfig,
};

use crate::orchestrator::{AnswerPipeline, PipelineBuilder};

/// Build the production pipeline from settings
///
/// Connects to the vector store eagerly so a dimension mismatch or an
/// unreachable index fails here, at startup, not on the first query.
pub async fn build_pipeline(settings: &Settings) -> crag_core::Result<AnswerPipeline> {
    settings
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;

    let llm = Arc::new(
        OllamaBackend::new(LlmConfig::from(&settings.llm)).map_err(crag_core::Error::from)?,
    );

    let embedder = Arc::new(OllamaEmbedder::new(EmbeddingConfig::from(&settings.embedding)));

    let store = Arc::new(
        VectorStore::new(VectorStoreConfig::from_settings(
            &settings.vector_store,
            &settings.embedding,
        ))
        .await
        .map_err(crag_core::Error::from)?,
    );

    let scorer = make_scorer()?;

    let retriever = Arc::new(RetrievalPipeline::new(
        RetrieverConfig::from(&settings.retrieval),
        embedder.clone(),
        store.clone(),
        scorer,
    ));

    let indexer = Arc::new(DocumentIndexer::new(
        LoaderConfig::from(&settings.chunking),
        embedder,
        store,
    ));

    tracing::info!(
        model = %settings.llm.model,
        collection = %settings.vector_store.collection,
        "CRAG pipeline ready"
    );

    Ok(PipelineBuilder::new(llm, retriever, indexer)
        .with_settings(settings)
        .build())
}

#[cfg(feature = "onnx")]
fn make_scorer() -> crag_core::Result<Arc<dyn crag_rag::CrossEncoder>> {
    use crag_config::constants::models;
    let encoder = crag_rag::OnnxCrossEncoder::new(models::RERANKER_MODEL, models::RERANKER_TOKENIZER)
        .map_err(crag_core::Error::from)?;
    Ok(Arc::new(encoder))
}

#[cfg(not(feature = "onnx"))]
fn make_scorer() -> crag_core::Result<Arc<dyn crag_rag::CrossEncoder>> {
    Ok(Arc::new(crag_rag::KeywordScorer))
}

/// Initialize tracing from `RUST_LOG`, defaulting to info
///
/// Call once from the hosting shell; safe to skip in tests.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
