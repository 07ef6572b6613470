//! Cross-encoder reranking
//!
//! Scores (query, passage) pairs with a more expensive relevance model than
//! the embedding similarity used for first-stage retrieval. The ONNX
//! cross-encoder emits softmax relevance in [0, 1]; the confidence gate's
//! threshold is calibrated to that scale. `KeywordScorer` is the
//! deterministic fallback when the `onnx` feature is off, and it stays on
//! the same scale.

#[cfg(feature = "onnx")]
use std::path::Path;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;

use crate::RagError;

/// Cross-encoder scoring seam
///
/// Scoring is CPU-bound and synchronous; callers running inside the async
/// runtime should wrap batches in `spawn_blocking`.
pub trait CrossEncoder: Send + Sync + 'static {
    /// Relevance of `passage` to `query`, higher is more relevant
    fn score(&self, query: &str, passage: &str) -> Result<f32, RagError>;
}

/// ONNX cross-encoder reranker
#[cfg(feature = "onnx")]
pub struct OnnxCrossEncoder {
    session: Session,
    tokenizer: Tokenizer,
    max_seq_len: usize,
}

#[cfg(feature = "onnx")]
impl OnnxCrossEncoder {
    /// Load a cross-encoder model and its tokenizer
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
    ) -> Result<Self, RagError> {
        let session = Session::builder()
            .map_err(|e| RagError::Reranker(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Reranker(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| RagError::Reranker(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        Ok(Self {
            session,
            tokenizer,
            max_seq_len: 256,
        })
    }

    fn run(&self, input_ids: Array2<i64>, attention_mask: Array2<i64>) -> Result<f32, RagError> {
        let input_ids_tensor =
            Tensor::from_array(input_ids).map_err(|e| RagError::Reranker(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(attention_mask).map_err(|e| RagError::Reranker(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            ])
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let (_, logits) = outputs
            .get("logits")
            .ok_or_else(|| RagError::Reranker("Missing logits output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        Ok(relevance_from_logits(logits))
    }
}

/// Softmax relevance from classifier logits, [0, 1]
#[cfg(feature = "onnx")]
fn relevance_from_logits(logits: &[f32]) -> f32 {
    if logits.len() >= 2 {
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp_sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
        (logits[1] - max).exp() / exp_sum
    } else if logits.len() == 1 {
        1.0 / (1.0 + (-logits[0]).exp())
    } else {
        0.0
    }
}

#[cfg(feature = "onnx")]
impl CrossEncoder for OnnxCrossEncoder {
    fn score(&self, query: &str, passage: &str) -> Result<f32, RagError> {
        let encoding = self
            .tokenizer
            .encode((query, passage), true)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let ids: Vec<i64> = encoding
            .get_ids()
            .iter()
            .take(self.max_seq_len)
            .map(|&id| id as i64)
            .collect();

        let mut padded_ids = vec![0i64; self.max_seq_len];
        let mut padded_mask = vec![0i64; self.max_seq_len];
        padded_ids[..ids.len()].copy_from_slice(&ids);
        for slot in padded_mask.iter_mut().take(ids.len()) {
            *slot = 1;
        }

        let input_ids = Array2::from_shape_vec((1, self.max_seq_len), padded_ids)
            .map_err(|e| RagError::Reranker(e.to_string()))?;
        let attention_mask = Array2::from_shape_vec((1, self.max_seq_len), padded_mask)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        self.run(input_ids, attention_mask)
    }
}

/// TF-IDF-flavored keyword scorer
///
/// Fallback when no model is available. Term frequency with diminishing
/// returns, a word-length IDF approximation, stopword filtering and a
/// coverage bonus, squashed into [0, 1].
pub struct KeywordScorer;

impl KeywordScorer {
    const STOPWORDS: &'static [&'static str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
        "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "about",
        "and", "but", "if", "or", "because", "until", "while", "not", "no", "nor", "so", "than",
        "too", "very", "just", "i", "me", "my", "we", "our", "you", "your", "he", "him", "his",
        "she", "her", "it", "its", "they", "them", "their", "what", "which", "who", "whom",
        "this", "that", "these", "those", "when", "where", "why", "how",
    ];

    pub fn score(query: &str, passage: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let passage_lower = passage.to_lowercase();

        let stopwords: std::collections::HashSet<&str> = Self::STOPWORDS.iter().copied().collect();

        let query_terms: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 1 && !stopwords.contains(*w))
            .collect();

        if query_terms.is_empty() {
            return 0.0;
        }

        let passage_words: Vec<&str> = passage_lower.split_whitespace().collect();
        let passage_len = passage_words.len().max(1) as f32;

        let mut total_score = 0.0f32;
        let mut matched_terms = 0usize;

        for (pos, term) in query_terms.iter().enumerate() {
            let tf = passage_words.iter().filter(|w| **w == *term).count() as f32;
            if tf > 0.0 {
                matched_terms += 1;

                let tf_score = tf.sqrt();
                let idf_approx = (1.0 + term.len() as f32).ln();
                let position_weight = 1.0 / (1.0 + pos as f32 * 0.1);
                let length_norm = 1.0 / (1.0 + (passage_len / 50.0).sqrt());

                total_score += tf_score * idf_approx * position_weight * length_norm;
            }
        }

        let coverage = matched_terms as f32 / query_terms.len() as f32;
        let raw_score = total_score + coverage * 0.3;
        (raw_score / (raw_score + 1.0)).min(1.0)
    }
}

impl CrossEncoder for KeywordScorer {
    fn score(&self, query: &str, passage: &str) -> Result<f32, RagError> {
        Ok(Self::score(query, passage))
    }
}
