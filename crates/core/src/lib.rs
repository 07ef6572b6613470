//! Core traits and types for the CRAG answer pipeline
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Role-based access control (roles, actions, permission table)
//! - Conversation types (turns, source references)
//! - Pipeline result types (categories, dispositions, query responses)
//! - Trait seams for pluggable backends (LLM, retriever, knowledge store)
//! - Error types

pub mod access;
pub mod conversation;
pub mod pipeline;
pub mod traits;

pub use access::{check_access, Action, UserRole};
pub use conversation::{SourceRef, Turn, TurnRole};
pub use pipeline::{
    Category, Disposition, IngestSummary, PassageDebug, QueryResponse, RetrievalDebug,
};
pub use traits::{KnowledgeStore, LanguageModel, Passage, Retriever};

use thiserror::Error;

/// Workspace-wide error type
///
/// Crate-local errors (`LlmError`, `RagError`, `ConfigError`) convert into
/// this at crate boundaries. The orchestrator never propagates `Llm` or
/// `Retrieval` out of the chat path; those are caught at call sites with
/// documented fallbacks.
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Forbidden: role {role:?} may not perform {action:?}")]
    Forbidden { role: UserRole, action: Action },
}

pub type Result<T> = std::result::Result<T, Error>;
