//! Knowledge store administration trait

use async_trait::async_trait;
use std::path::Path;

use crate::pipeline::IngestSummary;
use crate::Result;

/// Administrative surface of the document index
///
/// Consumed by the orchestrator behind access-control checks; the
/// orchestrator itself never touches the vector store directly.
#[async_trait]
pub trait KnowledgeStore: Send + Sync + 'static {
    /// Load, chunk, embed and index one document file
    async fn ingest(&self, file_path: &Path) -> Result<IngestSummary>;

    /// Drop and recreate the index
    async fn clear(&self) -> Result<()>;

    /// Distinct source file names currently indexed
    async fn sources(&self) -> Result<Vec<String>>;
}
