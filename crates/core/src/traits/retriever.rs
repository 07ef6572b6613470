//! Retrieval trait and passage type

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::SourceRef;
use crate::Result;

/// A retrievable chunk of source text with metadata and a relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Stable chunk id
    pub id: String,
    /// Chunk text content
    pub content: String,
    /// Rerank score, highest is most relevant. `None` when the configured
    /// reranker does not emit scores.
    pub score: Option<f32>,
    /// Source file name
    pub file_name: String,
    /// Page or location label within the source file
    pub page_label: String,
}

impl Passage {
    /// Citation reference for this passage
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            file_name: self.file_name.clone(),
            page_label: self.page_label.clone(),
            score: self.score,
        }
    }

    /// Truncated text preview for debug views
    pub fn preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}

/// Retrieve-and-rerank pipeline seam
///
/// Implementations:
/// - `RetrievalPipeline` - dense search + cross-encoder rerank (crag-rag)
/// - fixed-passage stubs in tests
#[async_trait]
pub trait Retriever: Send + Sync + 'static {
    /// Fetch the most relevant passages for a standalone search query,
    /// most relevant first. An empty result means no evidence; callers
    /// must not synthesize from it.
    async fn retrieve_and_rerank(&self, search_query: &str) -> Result<Vec<Passage>>;
}
