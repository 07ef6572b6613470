//! Confidence gate
//!
//! The corrective step: evidence that is missing or too weak vetoes
//! generation entirely. Empty retrieval always rejects. A scored top
//! passage rejects below the threshold. An unscored top passage accepts by
//! default (some rerankers emit no scores); `reject_unscored` flips that.

use crag_core::Passage;

/// Gate configuration and policy
#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    /// Minimum acceptable top score, on the configured reranker's scale
    pub threshold: f32,
    /// Treat an unscored top passage like empty evidence
    pub reject_unscored: bool,
}

impl ConfidenceGate {
    pub fn new(threshold: f32, reject_unscored: bool) -> Self {
        Self {
            threshold,
            reject_unscored,
        }
    }

    pub fn from_settings(settings: &crag_config::RetrievalSettings) -> Self {
        Self::new(settings.confidence_threshold, settings.reject_unscored)
    }

    /// Decide whether the passage set is good enough to synthesize from
    pub fn evaluate(&self, passages: &[Passage]) -> GateDecision {
        let top_score = passages.first().and_then(|passage| passage.score);

        let accepted = match (passages.is_empty(), top_score) {
            (true, _) => false,
            (false, Some(score)) => score >= self.threshold,
            (false, None) => !self.reject_unscored,
        };

        tracing::debug!(
            accepted,
            ?top_score,
            threshold = self.threshold,
            passages = passages.len(),
            "Confidence gate"
        );

        GateDecision {
            accepted,
            top_score,
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::from_settings(&crag_config::RetrievalSettings::default())
    }
}

/// Gate verdict with the evidence it was based on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub accepted: bool,
    pub top_score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::passage;

    #[test]
    fn test_empty_rejects() {
        let gate = ConfidenceGate::default();
        let decision = gate.evaluate(&[]);
        assert!(!decision.accepted);
        assert_eq!(decision.top_score, None);
    }

    #[test]
    fn test_below_threshold_rejects() {
        let gate = ConfidenceGate::default();
        let passages = vec![passage("weak match", Some(0.34))];
        assert!(!gate.evaluate(&passages).accepted);
    }

    #[test]
    fn test_at_threshold_accepts() {
        let gate = ConfidenceGate::default();
        let passages = vec![passage("ok match", Some(0.35))];
        assert!(gate.evaluate(&passages).accepted);
    }

    #[test]
    fn test_unscored_accepts_by_default() {
        let gate = ConfidenceGate::default();
        let passages = vec![passage("unscored", None)];
        let decision = gate.evaluate(&passages);
        assert!(decision.accepted);
        assert_eq!(decision.top_score, None);
    }

    #[test]
    fn test_unscored_rejects_when_configured() {
        let gate = ConfidenceGate::new(0.35, true);
        let passages = vec![passage("unscored", None)];
        assert!(!gate.evaluate(&passages).accepted);
    }

    #[test]
    fn test_only_top_passage_is_judged() {
        // A weak tail does not reject a strong top passage
        let gate = ConfidenceGate::default();
        let passages = vec![
            passage("strong", Some(0.9)),
            passage("weak", Some(0.01)),
        ];
        assert!(gate.evaluate(&passages).accepted);
    }
}
