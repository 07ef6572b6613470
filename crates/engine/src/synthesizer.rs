//! Answer synthesis
//!
//! Builds the strict context-bound prompt and runs the single generation
//! call. The prompt is the primary grounding control: answer only from the
//! passed passages, fixed not-found sentence, no outside knowledge.

use std::sync::Arc;

use crag_core::{LanguageModel, Passage, SourceRef};
use crag_llm::synthesis_prompt;

/// Synthesized answer plus the citations backing it
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    pub answer: String,
    /// One reference per passage used, in rerank order
    pub sources: Vec<SourceRef>,
}

/// Grounded answer generator
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Generate an answer from the accepted passages
    ///
    /// Passages must be non-empty; the confidence gate guarantees that on
    /// the orchestrator path.
    pub async fn synthesize(
        &self,
        search_query: &str,
        passages: &[Passage],
    ) -> crag_core::Result<SynthesizedAnswer> {
        let context = passages
            .iter()
            .map(|passage| passage.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = synthesis_prompt(&context, search_query);
        let answer = self.llm.complete(&prompt).await?;

        let sources = passages.iter().map(|passage| passage.source_ref()).collect();

        Ok(SynthesizedAnswer {
            answer: answer.trim().to_string(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{passage, StubLlm};

    #[tokio::test]
    async fn test_synthesize_returns_answer_and_sources() {
        let llm = Arc::new(StubLlm::scripted(&["The tenant pays the water bill."]));
        let synthesizer = AnswerSynthesizer::new(llm);

        let passages = vec![
            passage("Clause 7: the tenant pays the water bill.", Some(0.9)),
            passage("Clause 8: the landlord maintains the roof.", Some(0.5)),
        ];

        let result = synthesizer
            .synthesize("Who pays the water bill?", &passages)
            .await
            .unwrap();

        assert_eq!(result.answer, "The tenant pays the water bill.");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].score, Some(0.9));
    }

    #[tokio::test]
    async fn test_model_error_propagates_to_caller() {
        // The orchestrator catches this and emits the low-confidence
        // fallback; the synthesizer itself stays transparent.
        let llm = Arc::new(StubLlm::failing());
        let synthesizer = AnswerSynthesizer::new(llm);

        let passages = vec![passage("some clause", Some(0.9))];
        let result = synthesizer.synthesize("query", &passages).await;
        assert!(result.is_err());
    }
}
