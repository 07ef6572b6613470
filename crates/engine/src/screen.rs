//! Hallucination screen
//!
//! Post-hoc veto on the synthesized answer's surface text: long answers
//! that read like off-domain prose get blocked even after synthesis. This
//! is a blunt heuristic and will over- and under-trigger; it runs purely on
//! the answer text, downstream of and independent from grounding.

use crag_config::constants::screen::{MAX_UNSCREENED_LEN, OFF_DOMAIN_MARKERS};

/// Screen verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenVerdict {
    Pass,
    /// Answer discarded; the orchestrator substitutes the fixed refusal
    Blocked,
}

/// Surface-text answer screen
#[derive(Debug, Clone)]
pub struct HallucinationScreen {
    /// Answers at or below this length always pass
    max_unscreened_len: usize,
}

impl HallucinationScreen {
    pub fn new(max_unscreened_len: usize) -> Self {
        Self { max_unscreened_len }
    }

    pub fn from_settings(settings: &crag_config::ScreenSettings) -> Self {
        Self::new(settings.max_unscreened_len)
    }

    /// Screen an answer
    pub fn screen(&self, answer: &str) -> ScreenVerdict {
        if answer.len() <= self.max_unscreened_len {
            return ScreenVerdict::Pass;
        }

        let lower = answer.to_lowercase();
        for marker in OFF_DOMAIN_MARKERS {
            if lower.contains(marker) {
                tracing::warn!(marker, len = answer.len(), "Hallucination screen tripped");
                return ScreenVerdict::Blocked;
            }
        }

        ScreenVerdict::Pass
    }
}

impl Default for HallucinationScreen {
    fn default() -> Self {
        Self::new(MAX_UNSCREENED_LEN)
    }
}
