//! Intent classification
//!
//! Routes each query to one of five categories. A small greeting lexicon
//! short-circuits the model call for the most common inputs; everything
//! else goes through the rubric prompt. Parsing is substring-based in a
//! fixed precedence with DOMAIN as the default arm, so any classifier
//! ambiguity or model failure degrades toward "treat it as a real domain
//! question" rather than mis-firing a canned branch.

use std::sync::Arc;

use crag_config::constants::intent::GREETING_LEXICON;
use crag_core::{Category, LanguageModel};
use crag_llm::classification_prompt;

/// Query classifier
pub struct IntentClassifier {
    llm: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Classify a raw query
    pub async fn classify(&self, query: &str) -> Category {
        let normalized = normalize(query);

        if GREETING_LEXICON.contains(&normalized.as_str()) {
            tracing::debug!(query, "Greeting lexicon fast path");
            return Category::Greeting;
        }

        let response = match self.llm.complete(&classification_prompt(query)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Classifier model call failed, defaulting to DOMAIN");
                return Category::Domain;
            },
        };

        let category = parse_category(&response);
        tracing::debug!(query, ?category, raw = %response.trim(), "Query classified");
        category
    }
}

/// Lowercase and strip trailing punctuation
fn normalize(query: &str) -> String {
    query
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase()
}

/// Substring match in fixed precedence; DOMAIN is the default arm
fn parse_category(response: &str) -> Category {
    let upper = response.to_uppercase();
    // Precedence matters: the first recognized token wins, and anything
    // unrecognized is a domain question.
    for category in [
        Category::Greeting,
        Category::Session,
        Category::General,
        Category::Dependent,
    ] {
        if upper.contains(category.token()) {
            return category;
        }
    }
    Category::Domain
}
