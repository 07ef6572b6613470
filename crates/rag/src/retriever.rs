//! Retrieve-and-rerank pipeline
//!
//! First-stage dense retrieval from the vector store, then cross-encoder
//! rescoring of each (query, passage) pair. Empty retrieval short-circuits;
//! the confidence gate downstream treats empty as automatic rejection.

use async_trait::async_trait;
use std::sync::Arc;

use crag_core::{Passage, Retriever};

use crate::embeddings::Embedder;
use crate::reranker::CrossEncoder;
use crate::vector_store::VectorStore;
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Candidates fetched from dense search
    pub top_k: usize,
    /// Passages kept after reranking
    pub rerank_top_n: usize,
    /// Enable cross-encoder rescoring. When disabled, passages come back in
    /// vector order with no score attached.
    pub rerank_enabled: bool,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: crag_config::constants::retrieval::DENSE_TOP_K,
            rerank_top_n: crag_config::constants::retrieval::RERANK_TOP_N,
            rerank_enabled: true,
        }
    }
}

impl From<&crag_config::RetrievalSettings> for RetrieverConfig {
    fn from(settings: &crag_config::RetrievalSettings) -> Self {
        Self {
            top_k: settings.top_k,
            rerank_top_n: settings.rerank_top_n,
            rerank_enabled: settings.rerank_enabled,
        }
    }
}

/// Dense retrieval + cross-encoder rerank
pub struct RetrievalPipeline {
    config: RetrieverConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    scorer: Arc<dyn CrossEncoder>,
}

impl RetrievalPipeline {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
        scorer: Arc<dyn CrossEncoder>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
            scorer,
        }
    }

    async fn search(&self, search_query: &str) -> Result<Vec<Passage>, RagError> {
        let query_embedding = self.embedder.embed(search_query).await?;

        let hits = self
            .store
            .search(&query_embedding, self.config.top_k)
            .await?;

        if hits.is_empty() {
            tracing::debug!(query = search_query, "Dense retrieval returned nothing");
            return Ok(Vec::new());
        }

        if !self.config.rerank_enabled {
            return Ok(hits
                .into_iter()
                .take(self.config.rerank_top_n)
                .map(|hit| Passage {
                    id: hit.id,
                    content: hit.content,
                    score: None,
                    file_name: hit.file_name,
                    page_label: hit.page_label,
                })
                .collect());
        }

        // Cross-encoder scoring is CPU-bound; run the batch off the async
        // worker threads.
        let scorer = Arc::clone(&self.scorer);
        let query = search_query.to_string();
        let pairs: Vec<String> = hits.iter().map(|hit| hit.content.clone()).collect();

        let scores = tokio::task::spawn_blocking(move || {
            pairs
                .iter()
                .map(|passage| scorer.score(&query, passage))
                .collect::<Result<Vec<f32>, RagError>>()
        })
        .await
        .map_err(|e| RagError::Reranker(format!("Rerank task failed: {}", e)))??;

        let mut scored: Vec<Passage> = hits
            .into_iter()
            .zip(scores)
            .map(|(hit, score)| Passage {
                id: hit.id,
                content: hit.content,
                score: Some(score),
                file_name: hit.file_name,
                page_label: hit.page_label,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.rerank_top_n);

        tracing::debug!(
            query = search_query,
            kept = scored.len(),
            top_score = ?scored.first().and_then(|p| p.score),
            "Rerank complete"
        );

        Ok(scored)
    }
}

#[async_trait]
impl Retriever for RetrievalPipeline {
    async fn retrieve_and_rerank(&self, search_query: &str) -> crag_core::Result<Vec<Passage>> {
        Ok(self.search(search_query).await.map_err(crag_core::Error::from)?)
    }
}
