//! Conversation types: turns and source references

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single exchange entry in a session's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    /// Citations attached to an assistant turn (empty for user turns)
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            sources: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            sources,
            timestamp: Utc::now(),
        }
    }

    /// Render as a `role: text` line for history prompts
    pub fn as_prompt_line(&self) -> String {
        format!("{}: {}", self.role, self.text)
    }
}

/// Where a retrieved passage came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source file name (not a full path)
    pub file_name: String,
    /// Page or location label within the file
    pub page_label: String,
    /// Relevance score, if the reranker emitted one
    pub score: Option<f32>,
}

impl SourceRef {
    /// User-facing citation line
    pub fn format_citation(&self) -> String {
        let score = match self.score {
            Some(s) => format!("{:.2}", s),
            None => "N/A".to_string(),
        };
        format!("{} (Page {}) - Score: {}", self.file_name, self.page_label, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_prompt_line() {
        let turn = Turn::user("Who pays the water bill?");
        assert_eq!(turn.as_prompt_line(), "user: Who pays the water bill?");
    }

    #[test]
    fn test_citation_with_score() {
        let source = SourceRef {
            file_name: "lease_agreement.txt".to_string(),
            page_label: "3".to_string(),
            score: Some(0.8217),
        };
        assert_eq!(
            source.format_citation(),
            "lease_agreement.txt (Page 3) - Score: 0.82"
        );
    }

    #[test]
    fn test_citation_without_score() {
        let source = SourceRef {
            file_name: "handbook.md".to_string(),
            page_label: "1".to_string(),
            score: None,
        };
        assert_eq!(source.format_citation(), "handbook.md (Page 1) - Score: N/A");
    }
}
