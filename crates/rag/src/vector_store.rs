//! Vector store using Qdrant
//!
//! Dense passage storage and similarity search. The collection is created on
//! first use; if it already exists with a different vector dimension the
//! constructor fails instead of letting searches degrade silently.

use qdrant_client::{
    qdrant::{
        vectors_config, CreateCollectionBuilder, Distance, PointStruct, ScrollPointsBuilder,
        SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    },
    Qdrant,
};
use std::collections::{BTreeSet, HashMap};

use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Qdrant endpoint
    pub endpoint: String,
    /// Collection name
    pub collection: String,
    /// Vector dimension, must match the embedder
    pub vector_dim: usize,
    /// API key (optional)
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: crag_config::constants::endpoints::QDRANT_DEFAULT.to_string(),
            collection: crag_config::constants::retrieval::COLLECTION_NAME.to_string(),
            vector_dim: crag_config::constants::retrieval::EMBEDDING_DIM,
            api_key: None,
        }
    }
}

impl VectorStoreConfig {
    pub fn from_settings(
        store: &crag_config::VectorStoreSettings,
        embedding: &crag_config::EmbeddingSettings,
    ) -> Self {
        Self {
            endpoint: store.endpoint.clone(),
            collection: store.collection.clone(),
            vector_dim: embedding.dim,
            api_key: store.api_key.clone(),
        }
    }
}

/// A passage as stored in the index
#[derive(Debug, Clone)]
pub struct StoredPassage {
    /// Point id (UUID string)
    pub id: String,
    pub content: String,
    pub file_name: String,
    pub page_label: String,
}

/// A search hit from the store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    pub id: String,
    /// Cosine similarity to the query vector
    pub score: f32,
    pub content: String,
    pub file_name: String,
    pub page_label: String,
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Connect and ensure the collection exists with the right dimension
    pub async fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        let store = Self { client, config };
        store.ensure_collection().await?;
        Ok(store)
    }

    /// Create the collection if missing; fail fast on dimension mismatch
    async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            tracing::info!(
                collection = %self.config.collection,
                dim = self.config.vector_dim,
                "Collection not found, creating it"
            );
            self.create_collection().await?;
            return Ok(());
        }

        if let Some(existing_dim) = self.collection_dim().await? {
            if existing_dim != self.config.vector_dim {
                return Err(RagError::DimensionMismatch {
                    collection: existing_dim,
                    embedder: self.config.vector_dim,
                });
            }
        }

        Ok(())
    }

    async fn create_collection(&self) -> Result<(), RagError> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                    VectorParamsBuilder::new(self.config.vector_dim as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Read the configured vector dimension of the existing collection
    async fn collection_dim(&self) -> Result<Option<usize>, RagError> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        let dim = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|c| match c {
                vectors_config::Config::Params(params) => Some(params.size as usize),
                vectors_config::Config::ParamsMap(_) => None,
            });

        Ok(dim)
    }

    /// Bulk insert passages with their embeddings
    pub async fn upsert(
        &self,
        passages: &[StoredPassage],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if passages.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "Passage and embedding count mismatch".to_string(),
            ));
        }
        if passages.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = passages
            .iter()
            .zip(embeddings.iter())
            .map(|(passage, embedding)| {
                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert("text".to_string(), passage.content.clone().into());
                payload.insert("file_name".to_string(), passage.file_name.clone().into());
                payload.insert("page_label".to_string(), passage.page_label.clone().into());

                PointStruct::new(passage.id.clone(), embedding.clone(), payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(())
    }

    /// Nearest-neighbor search by query vector
    pub async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>, RagError> {
        if query_embedding.len() != self.config.vector_dim {
            return Err(RagError::DimensionMismatch {
                collection: self.config.vector_dim,
                embedder: query_embedding.len(),
            });
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    &self.config.collection,
                    query_embedding.to_vec(),
                    top_k as u64,
                )
                .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        let hits = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let id = point
                    .id
                    .map(|pid| match pid.point_id_options {
                        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
                        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => {
                            n.to_string()
                        },
                        None => String::new(),
                    })
                    .unwrap_or_default();

                VectorSearchResult {
                    id,
                    score: point.score,
                    content: string_payload(&payload, "text"),
                    file_name: string_payload(&payload, "file_name"),
                    page_label: string_payload(&payload, "page_label"),
                }
            })
            .collect();

        Ok(hits)
    }

    /// Drop and recreate the collection
    pub async fn clear(&self) -> Result<(), RagError> {
        self.client
            .delete_collection(self.config.collection.as_str())
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;
        self.create_collection().await
    }

    /// Distinct source file names currently indexed
    pub async fn list_sources(&self) -> Result<Vec<String>, RagError> {
        let mut sources = BTreeSet::new();
        let mut offset = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.config.collection)
                .limit(256)
                .with_payload(true);
            if let Some(next) = offset {
                builder = builder.offset(next);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            for point in &response.result {
                let file_name = string_payload(&point.payload, "file_name");
                if !file_name.is_empty() {
                    sources.insert(file_name);
                }
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(sources.into_iter().collect())
    }

    /// Number of indexed points
    pub async fn point_count(&self) -> Result<u64, RagError> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(info
            .result
            .map(|r| r.points_count.unwrap_or(0))
            .unwrap_or(0))
    }
}

fn string_payload(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|value| match &value.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}
