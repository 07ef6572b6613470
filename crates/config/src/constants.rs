//! Centralized constants for the CRAG pipeline
//!
//! Single source of truth for thresholds, model names, lexicons and default
//! endpoints. Components take their defaults from here instead of hardcoding
//! values in multiple files.

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Ollama endpoint, serves both generation and embeddings
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";

    /// Qdrant vector store endpoint
    pub const QDRANT_DEFAULT: &str = "http://localhost:6333";
}

/// Model identifiers
pub mod models {
    /// Small language model used for every text-service call
    pub const LLM_MODEL: &str = "phi3:mini";

    /// Embedding model; its dimension must match [`super::retrieval::EMBEDDING_DIM`]
    pub const EMBEDDING_MODEL: &str = "bge-small-en-v1.5";

    /// Cross-encoder reranker model file (used by the `onnx` feature)
    pub const RERANKER_MODEL: &str = "models/ms-marco-minilm-l6-v2.onnx";
    pub const RERANKER_TOKENIZER: &str = "models/ms-marco-minilm-l6-v2-tokenizer.json";
}

/// Retrieval and confidence-gate parameters
pub mod retrieval {
    /// Nearest neighbors fetched from the vector index
    pub const DENSE_TOP_K: usize = 10;

    /// Passages kept after cross-encoder reranking
    pub const RERANK_TOP_N: usize = 3;

    /// Gate threshold on the top rerank score. Calibrated to the softmax
    /// relevance scale of the configured cross-encoder (0.0 - 1.0); retune
    /// if the reranker changes.
    pub const CONFIDENCE_THRESHOLD: f32 = 0.35;

    /// Citations shown to end users
    pub const MAX_USER_SOURCES: usize = 3;

    /// Embedding dimension; collection creation fails fast on mismatch
    pub const EMBEDDING_DIM: usize = 384;

    /// Default collection name
    pub const COLLECTION_NAME: &str = "lease_knowledge";
}

/// Document chunking, tuned for dense legal/contractual text
pub mod chunking {
    /// Target chunk size in tokens
    pub const CHUNK_SIZE: usize = 512;

    /// Overlap between consecutive chunks in tokens
    pub const CHUNK_OVERLAP: usize = 100;
}

/// Language model limits
pub mod llm {
    /// Context window cap passed to the backend
    pub const NUM_CTX: usize = 2048;

    /// Generated answer length cap
    pub const NUM_PREDICT: usize = 512;

    /// Request timeout; the only latency bound on a pipeline stage
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
}

/// Session handling
pub mod session {
    /// History turns included in contextualizer prompts
    pub const MAX_HISTORY_TURNS: usize = 3;

    /// Extracted display names longer than this are rejected
    pub const MAX_NAME_LEN: usize = 20;
}

/// Intent classification
pub mod intent {
    /// Queries that match this lexicon after normalization classify as
    /// GREETING without a model call. Must stay consistent with what the
    /// model path would return for the same inputs.
    pub const GREETING_LEXICON: &[&str] = &[
        "hello",
        "hi",
        "hey",
        "thanks",
        "thank you",
        "good morning",
        "good afternoon",
        "good evening",
    ];
}

/// Hallucination screen
pub mod screen {
    /// Answers at or below this length always pass
    pub const MAX_UNSCREENED_LEN: usize = 500;

    /// Off-domain markers; a long answer containing any of these is vetoed
    pub const OFF_DOMAIN_MARKERS: &[&str] = &[
        "essay",
        "methodology",
        "urban planning",
        "renewable energy",
        "introduction",
        "conclusion",
    ];
}

/// Deterministic grammar fixes applied to every search query
///
/// Small fixed table of malformations seen in real user queries. Runs
/// independently of the language model.
pub mod grammar {
    pub const PHRASE_FIXES: &[(&str, &str)] = &[
        ("should included", "should be included"),
        ("should excluded", "should be excluded"),
        ("who responsible", "who is responsible"),
        ("what included in", "what is included in"),
    ];
}
