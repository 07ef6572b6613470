//! CRAG decision engine
//!
//! The per-query state machine: classify → branch → (contextualize →
//! retrieve → gate → synthesize → screen) → done, with role-based access
//! control in front of every operation and per-session memory behind it.
//!
//! Services are injected at construction ([`PipelineBuilder`]); the engine
//! holds no globals, so independent pipelines (and test stubs) can coexist.

pub mod bootstrap;
pub mod classifier;
pub mod contextualizer;
pub mod gate;
pub mod orchestrator;
pub mod screen;
pub mod session;
pub mod synthesizer;

pub use bootstrap::{build_pipeline, init_tracing};
pub use classifier::IntentClassifier;
pub use contextualizer::{normalize_grammar, QueryContextualizer};
pub use gate::{ConfidenceGate, GateDecision};
pub use orchestrator::{AnswerPipeline, DocumentScope, PipelineBuilder};
pub use screen::{HallucinationScreen, ScreenVerdict};
pub use session::{Session, SessionContext, SessionStore};

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted stand-ins for the external services

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crag_core::{LanguageModel, Passage, Retriever};

    /// Language model that replays scripted responses and counts calls
    pub struct StubLlm {
        responses: Mutex<VecDeque<String>>,
        pub calls: AtomicUsize,
        fail: bool,
        fail_when_exhausted: bool,
    }

    impl StubLlm {
        pub fn scripted(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                calls: AtomicUsize::new(0),
                fail: false,
                fail_when_exhausted: false,
            }
        }

        /// Replay the script, then error on every further call
        pub fn scripted_then_fail(responses: &[&str]) -> Self {
            Self {
                fail_when_exhausted: true,
                ..Self::scripted(responses)
            }
        }

        pub fn failing() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                fail: true,
                fail_when_exhausted: false,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LanguageModel for StubLlm {
        async fn complete(&self, _prompt: &str) -> crag_core::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(crag_core::Error::Llm("stub failure".to_string()));
            }
            match self.responses.lock().pop_front() {
                Some(response) => Ok(response),
                None if self.fail_when_exhausted => {
                    Err(crag_core::Error::Llm("stub script exhausted".to_string()))
                },
                None => Ok("DOMAIN".to_string()),
            }
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    /// Retriever that returns a fixed passage list and counts calls
    pub struct StubRetriever {
        passages: Vec<Passage>,
        pub calls: AtomicUsize,
    }

    impl StubRetriever {
        pub fn with_passages(passages: Vec<Passage>) -> Self {
            Self {
                passages,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn empty() -> Self {
            Self::with_passages(Vec::new())
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn retrieve_and_rerank(&self, _query: &str) -> crag_core::Result<Vec<Passage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.passages.clone())
        }
    }

    pub fn passage(content: &str, score: Option<f32>) -> Passage {
        Passage {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            score,
            file_name: "lease_agreement.txt".to_string(),
            page_label: "4".to_string(),
        }
    }
}
