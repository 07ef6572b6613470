//! Pipeline result types
//!
//! Every query terminates in a well-formed [`QueryResponse`], whatever
//! happened along the way: answered, refused, clarification requested,
//! no evidence, screened, or forbidden. Callers branch on [`Disposition`]
//! rather than parsing answer text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classifier output, selects the orchestrator branch for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Salutations and pleasantries
    Greeting,
    /// The user is telling us something about themselves
    Session,
    /// General knowledge outside the document domain
    General,
    /// A self-contained question about the document domain
    Domain,
    /// A follow-up that only makes sense with conversation history
    Dependent,
}

impl Category {
    /// Token name used in classifier prompts and response parsing
    pub fn token(&self) -> &'static str {
        match self {
            Category::Greeting => "GREETING",
            Category::Session => "SESSION",
            Category::General => "GENERAL",
            Category::Domain => "DOMAIN",
            Category::Dependent => "DEPENDENT",
        }
    }
}

/// Terminal outcome of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Grounded answer synthesized from retrieved passages
    Answered,
    /// Canned greeting reply
    Greeting,
    /// Acknowledged a session detail (e.g. remembered a name)
    SessionUpdate,
    /// Refused: outside the document domain
    OutOfScope,
    /// Follow-up with no history to resolve it against
    NeedsClarification,
    /// Retrieval came back empty or below the confidence threshold
    NoEvidence,
    /// Hallucination screen vetoed the synthesized answer
    Blocked,
    /// Access control denied the operation
    Forbidden,
}

/// The value returned for every query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Answer or fallback text shown to the user
    pub answer: String,
    /// Up to three formatted citations
    pub sources: Vec<String>,
    pub category: Category,
    pub disposition: Disposition,
    /// Context updates the orchestrator merged into the session
    #[serde(default)]
    pub context_updates: HashMap<String, String>,
    /// Retrieval internals, present only for roles with debug access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<RetrievalDebug>,
}

impl QueryResponse {
    /// A response with no sources, no context updates and no debug view
    pub fn plain(answer: impl Into<String>, category: Category, disposition: Disposition) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            category,
            disposition,
            context_updates: HashMap::new(),
            debug: None,
        }
    }
}

/// Privileged view of what retrieval produced, including gate near-misses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalDebug {
    /// Whether the confidence gate accepted the passage set
    pub gate_accepted: bool,
    /// Best rerank score, if any passage carried one
    pub top_score: Option<f32>,
    pub passages: Vec<PassageDebug>,
}

/// One passage in the debug view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageDebug {
    pub file_name: String,
    pub page_label: String,
    pub score: Option<f32>,
    /// First 100 characters of the passage text
    pub preview: String,
}

/// Result of ingesting one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub file_name: String,
    pub pages: usize,
    pub chunks: usize,
}

impl std::fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Successfully ingested {} pages ({} chunks) from {}",
            self.pages, self.chunks, self.file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tokens() {
        assert_eq!(Category::Greeting.token(), "GREETING");
        assert_eq!(Category::Dependent.token(), "DEPENDENT");
    }

    #[test]
    fn test_plain_response() {
        let response = QueryResponse::plain("hi", Category::Greeting, Disposition::Greeting);
        assert!(response.sources.is_empty());
        assert!(response.context_updates.is_empty());
        assert!(response.debug.is_none());
    }

    #[test]
    fn test_ingest_summary_display() {
        let summary = IngestSummary {
            file_name: "lease.txt".to_string(),
            pages: 10,
            chunks: 42,
        };
        assert_eq!(
            summary.to_string(),
            "Successfully ingested 10 pages (42 chunks) from lease.txt"
        );
    }
}
