//! Query contextualization
//!
//! Turns an ambiguous follow-up into a standalone search query by merging
//! in recent conversation history, then widens recall by appending the
//! model's auxiliary queries into one composite search string. A safety
//! valve discards degenerate or refusal-flavored rewrites so they cannot
//! poison retrieval: the original query is always a valid fallback.

use std::sync::Arc;

use crag_config::constants::grammar::PHRASE_FIXES;
use crag_config::constants::session::MAX_HISTORY_TURNS;
use crag_core::LanguageModel;
use crag_llm::rewrite_prompt;

/// Labels the model tends to prefix rewrites with
const LABELS: &[&str] = &["rewritten question:", "standalone question:", "question:"];

/// Marker of a refusal-flavored rewrite
const APOLOGY_MARKER: &str = "apologize";

/// Rewrites dependent queries against conversation history
pub struct QueryContextualizer {
    llm: Arc<dyn LanguageModel>,
}

impl QueryContextualizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Build a standalone search query for a DEPENDENT follow-up
    ///
    /// `history` must be non-empty; the orchestrator answers with a
    /// clarification request before ever calling this with no history.
    /// The first line of the model output is the standalone rewrite and is
    /// what the safety valve judges; the auxiliary lines only ever widen a
    /// rewrite that already passed.
    pub async fn contextualize(&self, query: &str, history: &[String]) -> String {
        let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
        let recent = &history[start..];

        let raw = match self.llm.complete(&rewrite_prompt(query, recent)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Rewrite model call failed, using original query");
                return query.to_string();
            },
        };

        let mut lines = clean_lines(&raw);
        if lines.is_empty() {
            tracing::debug!(original = query, "Empty rewrite, using original query");
            return query.to_string();
        }

        let rewritten = lines.remove(0);
        if !passes_safety_valve(query, &rewritten) {
            tracing::debug!(
                original = query,
                rejected = %rewritten,
                "Rewrite failed safety valve, using original query"
            );
            return query.to_string();
        }

        // Mega-query: rewrite plus auxiliary queries, refusal-flavored
        // auxiliaries dropped
        let mut parts = vec![rewritten];
        parts.extend(
            lines
                .into_iter()
                .filter(|line| !line.to_lowercase().contains(APOLOGY_MARKER)),
        );
        let composite = parts.join(" ");

        tracing::debug!(original = query, rewritten = %composite, "Query contextualized");
        composite
    }
}

/// Strip labels, list numbering and surrounding quotes from each line
fn clean_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect()
}

fn clean_line(line: &str) -> String {
    static LIST_PREFIX: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"^\s*\d+[.)]\s*").expect("valid regex"));

    let without_number = LIST_PREFIX.replace(line.trim(), "");
    let mut text = without_number.trim();

    let lower = text.to_lowercase();
    for label in LABELS {
        if lower.starts_with(label) {
            text = text[label.len()..].trim_start();
            break;
        }
    }

    text.trim_matches(['"', '\'', '“', '”']).trim().to_string()
}

/// Reject empty, oversized or refusal-flavored rewrites
fn passes_safety_valve(original: &str, cleaned: &str) -> bool {
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.len() > original.len().saturating_mul(4) {
        return false;
    }
    if cleaned.to_lowercase().contains(APOLOGY_MARKER) {
        return false;
    }
    true
}

/// Deterministic grammar normalization
///
/// Applied to every DOMAIN/DEPENDENT search query, with or without a
/// rewrite, independent of the model.
pub fn normalize_grammar(query: &str) -> String {
    let mut normalized = query.to_string();
    for (malformed, fixed) in PHRASE_FIXES {
        if normalized.contains(malformed) {
            normalized = normalized.replace(malformed, fixed);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubLlm;

    #[tokio::test]
    async fn test_rewrite_strips_label_and_quotes() {
        let llm = Arc::new(StubLlm::scripted(&[
            "Rewritten Question: \"Who pays the water bill under the lease?\"",
        ]));
        let contextualizer = QueryContextualizer::new(llm);

        let history = vec!["user: Who is responsible for the water bill?".to_string()];
        let result = contextualizer.contextualize("Who pays it?", &history).await;
        assert_eq!(result, "Who pays the water bill under the lease?");
    }

    #[tokio::test]
    async fn test_mega_query_concatenates_lines() {
        let llm = Arc::new(StubLlm::scripted(&[
            "Question: Who pays the water bill?\n1. water bill tenant lease\n2. The tenant pays the water bill.",
        ]));
        let contextualizer = QueryContextualizer::new(llm);

        let history = vec!["assistant: The tenant.".to_string()];
        let result = contextualizer.contextualize("Who pays it?", &history).await;
        assert!(result.contains("Who pays the water bill?"));
        assert!(result.contains("water bill tenant lease"));
        assert!(result.contains("The tenant pays the water bill."));
    }

    #[tokio::test]
    async fn test_apology_falls_back_to_original_byte_for_byte() {
        let llm = Arc::new(StubLlm::scripted(&[
            "I apologize, but I cannot rewrite this question.",
        ]));
        let contextualizer = QueryContextualizer::new(llm);

        let original = "Who pays it?";
        let history = vec!["assistant: The tenant.".to_string()];
        let result = contextualizer.contextualize(original, &history).await;
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn test_oversized_rewrite_falls_back() {
        let oversized = "water bill ".repeat(40);
        let llm = Arc::new(StubLlm::scripted(&[oversized.as_str()]));
        let contextualizer = QueryContextualizer::new(llm);

        let original = "Who pays it?";
        let history = vec!["assistant: The tenant.".to_string()];
        let result = contextualizer.contextualize(original, &history).await;
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let llm = Arc::new(StubLlm::failing());
        let contextualizer = QueryContextualizer::new(llm);

        let original = "Who pays it?";
        let history = vec!["assistant: The tenant.".to_string()];
        let result = contextualizer.contextualize(original, &history).await;
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn test_only_recent_turns_reach_the_prompt() {
        // History longer than the window still works; the prompt content is
        // covered by prompt-module tests, here we only assert no panic and a
        // clean rewrite.
        let llm = Arc::new(StubLlm::scripted(&["What is the rent amount?"]));
        let contextualizer = QueryContextualizer::new(llm);

        let history: Vec<String> = (0..10).map(|i| format!("user: turn {}", i)).collect();
        let result = contextualizer.contextualize("How much?", &history).await;
        assert_eq!(result, "What is the rent amount?");
    }

    #[test]
    fn test_normalize_grammar_fixed_table() {
        assert_eq!(
            normalize_grammar("what should included in the notice"),
            "what should be included in the notice"
        );
        assert_eq!(
            normalize_grammar("who responsible for repairs"),
            "who is responsible for repairs"
        );
        // Untouched queries pass through unchanged
        assert_eq!(normalize_grammar("What is the rent?"), "What is the rent?");
    }

    #[test]
    fn test_clean_line_variants() {
        assert_eq!(clean_line("Question: What is the rent?"), "What is the rent?");
        assert_eq!(clean_line("1. rent amount lease"), "rent amount lease");
        assert_eq!(clean_line("\"quoted\""), "quoted");
        assert_eq!(clean_line("   "), "");
    }
}
