//! Document indexing
//!
//! Ties the loader, embedder and vector store together behind the core
//! `KnowledgeStore` trait: load → chunk → embed → upsert.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crag_core::{IngestSummary, KnowledgeStore};

use crate::embeddings::Embedder;
use crate::loader::{DocumentLoader, LoaderConfig};
use crate::vector_store::{StoredPassage, VectorStore};
use crate::RagError;

/// Indexer over a vector store
pub struct DocumentIndexer {
    loader: DocumentLoader,
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
}

impl DocumentIndexer {
    pub fn new(
        loader_config: LoaderConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
    ) -> Self {
        Self {
            loader: DocumentLoader::new(loader_config),
            embedder,
            store,
        }
    }

    async fn ingest_file(&self, file_path: &Path) -> Result<IngestSummary, RagError> {
        let (chunks, pages) = self.loader.load(file_path)?;

        if chunks.is_empty() {
            tracing::warn!(path = %file_path.display(), "Document produced no chunks");
            return Ok(IngestSummary {
                file_name: file_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default()
                    .to_string(),
                pages,
                chunks: 0,
            });
        }

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let passages: Vec<StoredPassage> = chunks
            .iter()
            .map(|chunk| StoredPassage {
                id: Uuid::new_v4().to_string(),
                content: chunk.text.clone(),
                file_name: chunk.file_name.clone(),
                page_label: chunk.page_label.clone(),
            })
            .collect();

        self.store.upsert(&passages, &embeddings).await?;

        let summary = IngestSummary {
            file_name: passages[0].file_name.clone(),
            pages,
            chunks: passages.len(),
        };

        tracing::info!(
            file = %summary.file_name,
            pages = summary.pages,
            chunks = summary.chunks,
            "Document ingested"
        );

        Ok(summary)
    }
}

#[async_trait]
impl KnowledgeStore for DocumentIndexer {
    async fn ingest(&self, file_path: &Path) -> crag_core::Result<IngestSummary> {
        Ok(self
            .ingest_file(file_path)
            .await
            .map_err(crag_core::Error::from)?)
    }

    async fn clear(&self) -> crag_core::Result<()> {
        Ok(self.store.clear().await.map_err(crag_core::Error::from)?)
    }

    async fn sources(&self) -> crag_core::Result<Vec<String>> {
        Ok(self
            .store
            .list_sources()
            .await
            .map_err(crag_core::Error::from)?)
    }
}
