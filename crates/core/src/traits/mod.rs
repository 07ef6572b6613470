//! Trait seams for pluggable backends
//!
//! The orchestrator and every component receive these as `Arc<dyn ...>` at
//! construction. Nothing reaches for a global model handle, so independent
//! pipeline instances (and test stubs) can coexist in one process.

mod knowledge;
mod llm;
mod retriever;

pub use knowledge::KnowledgeStore;
pub use llm::LanguageModel;
pub use retriever::{Passage, Retriever};
