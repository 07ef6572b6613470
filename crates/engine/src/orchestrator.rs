//! Pipeline orchestration
//!
//! Composes classifier, contextualizer, retrieval, confidence gate,
//! synthesizer and hallucination screen into the per-query state machine:
//!
//! CLASSIFY → { GREETING_REPLY | SESSION_REPLY | GENERAL_REFUSAL |
//!              CLARIFY_REQUEST | RUN_RAG } → DONE
//!
//! Nothing is retained across calls except the session store. Every entry
//! point checks the access gate first; a denial terminates with a
//! distinguishable forbidden outcome and no side effects. External-service
//! failures are caught here with their documented fallbacks; no query ever
//! surfaces an error through the chat path.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crag_config::constants::retrieval::MAX_USER_SOURCES;
use crag_config::constants::session::{MAX_HISTORY_TURNS, MAX_NAME_LEN};
use crag_config::Settings;
use crag_core::{
    check_access, Action, Category, Disposition, IngestSummary, KnowledgeStore, LanguageModel,
    Passage, PassageDebug, QueryResponse, Retriever, RetrievalDebug, SourceRef, Turn, UserRole,
};
use crag_llm::{name_extraction_prompt, ResponseTemplates};

use crate::classifier::IntentClassifier;
use crate::contextualizer::{normalize_grammar, QueryContextualizer};
use crate::gate::ConfidenceGate;
use crate::screen::{HallucinationScreen, ScreenVerdict};
use crate::session::SessionStore;
use crate::synthesizer::AnswerSynthesizer;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Visibility scope of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    Private,
    Global,
}

/// Builder wiring injected services into an [`AnswerPipeline`]
pub struct PipelineBuilder {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    knowledge: Arc<dyn KnowledgeStore>,
    gate: ConfidenceGate,
    screen: HallucinationScreen,
}

impl PipelineBuilder {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        knowledge: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            llm,
            retriever,
            knowledge,
            gate: ConfidenceGate::default(),
            screen: HallucinationScreen::default(),
        }
    }

    /// Take gate and screen parameters from loaded settings
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.gate = ConfidenceGate::from_settings(&settings.retrieval);
        self.screen = HallucinationScreen::from_settings(&settings.screen);
        self
    }

    pub fn with_gate(mut self, gate: ConfidenceGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_screen(mut self, screen: HallucinationScreen) -> Self {
        self.screen = screen;
        self
    }

    pub fn build(self) -> AnswerPipeline {
        AnswerPipeline {
            classifier: IntentClassifier::new(Arc::clone(&self.llm)),
            contextualizer: QueryContextualizer::new(Arc::clone(&self.llm)),
            synthesizer: AnswerSynthesizer::new(Arc::clone(&self.llm)),
            llm: self.llm,
            retriever: self.retriever,
            knowledge: self.knowledge,
            sessions: SessionStore::new(),
            gate: self.gate,
            screen: self.screen,
        }
    }
}

/// The CRAG decision engine
pub struct AnswerPipeline {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    knowledge: Arc<dyn KnowledgeStore>,
    sessions: SessionStore,
    classifier: IntentClassifier,
    contextualizer: QueryContextualizer,
    synthesizer: AnswerSynthesizer,
    gate: ConfidenceGate,
    screen: HallucinationScreen,
}

impl AnswerPipeline {
    /// Open a new session, returning its id
    pub fn start_session(&self, role: UserRole) -> crag_core::Result<String> {
        self.require(role, Action::StartChatSession)?;
        let session_id = Uuid::new_v4().to_string();
        self.sessions.get_or_create(&session_id);
        Ok(session_id)
    }

    /// Handle one query end to end
    ///
    /// Always returns a well-formed [`QueryResponse`]; access denial, missing
    /// evidence, screen trips and model failures are dispositions, not
    /// errors. Queries within one session are serialized on the session
    /// mutex; sessions are independent.
    pub async fn handle_query(
        &self,
        session_id: &str,
        role: UserRole,
        query: &str,
    ) -> QueryResponse {
        if !check_access(role, Action::SubmitChatQuery) {
            tracing::debug!(?role, "Query rejected by access gate");
            return QueryResponse::plain(
                ResponseTemplates::forbidden(),
                Category::Domain,
                Disposition::Forbidden,
            );
        }

        let session = self.sessions.get_or_create(session_id);
        let mut session = session.lock().await;

        let category = self.classifier.classify(query).await;
        let name = session.context.name.clone();

        let mut response = match category {
            Category::Greeting => QueryResponse::plain(
                ResponseTemplates::greeting(name.as_deref()),
                category,
                Disposition::Greeting,
            ),
            Category::Session => self.handle_session_update(query).await,
            Category::General => QueryResponse::plain(
                ResponseTemplates::general_refusal(name.as_deref()),
                category,
                Disposition::OutOfScope,
            ),
            Category::Domain | Category::Dependent => {
                let history = session.recent_history(MAX_HISTORY_TURNS);

                if category == Category::Dependent && history.is_empty() {
                    QueryResponse::plain(
                        ResponseTemplates::clarification(),
                        category,
                        Disposition::NeedsClarification,
                    )
                } else {
                    let search_query = if category == Category::Dependent {
                        self.contextualizer.contextualize(query, &history).await
                    } else {
                        query.to_string()
                    };
                    let search_query = normalize_grammar(&search_query);

                    self.run_rag(category, &search_query).await
                }
            },
        };

        session.context.merge(&response.context_updates);

        let turn_sources: Vec<SourceRef> = match response.disposition {
            Disposition::Answered => response
                .debug
                .as_ref()
                .map(|debug| {
                    debug
                        .passages
                        .iter()
                        .take(MAX_USER_SOURCES)
                        .map(|p| SourceRef {
                            file_name: p.file_name.clone(),
                            page_label: p.page_label.clone(),
                            score: p.score,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        session.record_exchange(query, Turn::assistant(response.answer.clone(), turn_sources));

        // Debug internals are for privileged eyes only
        if response.debug.is_some() && !check_access(role, Action::ViewRetrievalDebug) {
            response.debug = None;
        }

        response
    }

    /// SESSION branch: try to remember how the user wants to be addressed
    async fn handle_session_update(&self, query: &str) -> QueryResponse {
        let extracted = match self.llm.complete(&name_extraction_prompt(query)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Name extraction failed, acknowledging generically");
                return QueryResponse::plain(
                    ResponseTemplates::generic_ack(),
                    Category::Session,
                    Disposition::SessionUpdate,
                );
            },
        };

        let name = NON_WORD.replace_all(extracted.trim(), "").to_string();

        if name.is_empty() || name.eq_ignore_ascii_case("none") || name.len() >= MAX_NAME_LEN {
            return QueryResponse::plain(
                ResponseTemplates::generic_ack(),
                Category::Session,
                Disposition::SessionUpdate,
            );
        }

        let mut updates = HashMap::new();
        updates.insert("name".to_string(), name.clone());

        QueryResponse {
            answer: ResponseTemplates::name_ack(&name),
            sources: Vec::new(),
            category: Category::Session,
            disposition: Disposition::SessionUpdate,
            context_updates: updates,
            debug: None,
        }
    }

    /// RUN_RAG: retrieve → gate → synthesize → screen
    async fn run_rag(&self, category: Category, search_query: &str) -> QueryResponse {
        let passages = match self.retriever.retrieve_and_rerank(search_query).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, treating as no evidence");
                Vec::new()
            },
        };

        let decision = self.gate.evaluate(&passages);
        let debug = Some(build_debug(&passages, decision.accepted));

        if !decision.accepted {
            return QueryResponse {
                answer: ResponseTemplates::low_confidence(),
                sources: Vec::new(),
                category,
                disposition: Disposition::NoEvidence,
                context_updates: HashMap::new(),
                debug,
            };
        }

        let synthesized = match self.synthesizer.synthesize(search_query, &passages).await {
            Ok(synthesized) => synthesized,
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis failed, falling back to low confidence");
                return QueryResponse {
                    answer: ResponseTemplates::low_confidence(),
                    sources: Vec::new(),
                    category,
                    disposition: Disposition::NoEvidence,
                    context_updates: HashMap::new(),
                    debug,
                };
            },
        };

        if self.screen.screen(&synthesized.answer) == ScreenVerdict::Blocked {
            return QueryResponse {
                answer: ResponseTemplates::screen_refusal(),
                sources: Vec::new(),
                category,
                disposition: Disposition::Blocked,
                context_updates: HashMap::new(),
                debug,
            };
        }

        let sources: Vec<String> = synthesized
            .sources
            .iter()
            .take(MAX_USER_SOURCES)
            .map(SourceRef::format_citation)
            .collect();

        QueryResponse {
            answer: synthesized.answer,
            sources,
            category,
            disposition: Disposition::Answered,
            context_updates: HashMap::new(),
            debug,
        }
    }

    /// Ingest a document into the knowledge base
    pub async fn ingest_document(
        &self,
        role: UserRole,
        path: &Path,
        scope: DocumentScope,
    ) -> crag_core::Result<IngestSummary> {
        let action = match scope {
            DocumentScope::Private => Action::UploadPrivateDocument,
            DocumentScope::Global => Action::UploadGlobalDocument,
        };
        self.require(role, action)?;

        self.knowledge.ingest(path).await
    }

    /// Drop and recreate the index
    pub async fn reset_index(&self, role: UserRole) -> crag_core::Result<()> {
        self.require(role, Action::UploadGlobalDocument)?;
        self.knowledge.clear().await
    }

    /// Distinct source file names currently indexed
    pub async fn list_sources(&self, role: UserRole) -> crag_core::Result<Vec<String>> {
        self.require(role, Action::ViewGlobalDocuments)?;
        self.knowledge.sources().await
    }

    /// A session's turn history
    pub async fn history(&self, role: UserRole, session_id: &str) -> crag_core::Result<Vec<Turn>> {
        self.require(role, Action::ViewOwnChatHistory)?;
        let session = self.sessions.get_or_create(session_id);
        let session = session.lock().await;
        Ok(session.turns.clone())
    }

    /// Session store, exposed for hosting shells that manage lifecycles
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn require(&self, role: UserRole, action: Action) -> crag_core::Result<()> {
        if check_access(role, action) {
            Ok(())
        } else {
            Err(crag_core::Error::Forbidden { role, action })
        }
    }
}

fn build_debug(passages: &[Passage], gate_accepted: bool) -> RetrievalDebug {
    RetrievalDebug {
        gate_accepted,
        top_score: passages.first().and_then(|passage| passage.score),
        passages: passages
            .iter()
            .map(|passage| PassageDebug {
                file_name: passage.file_name.clone(),
                page_label: passage.page_label.clone(),
                score: passage.score,
                preview: passage.preview(100),
            })
            .collect(),
    }
}
