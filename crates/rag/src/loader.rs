//! Document loading and chunking
//!
//! Splits raw files into retrievable chunks with source metadata. Plain
//! text and markdown files are split into pages on form-feed characters
//! (a file without form feeds is a single page), then each page is chunked
//! into fixed-size overlapping windows tuned for dense legal/contractual
//! text. YAML/JSON knowledge packs carry a `documents` array of curated
//! entries; each entry is chunked the same way with its title as the
//! location label.

use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

use crate::RagError;

/// Loader configuration
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Target chunk size in tokens
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens
    pub overlap: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: crag_config::constants::chunking::CHUNK_SIZE,
            overlap: crag_config::constants::chunking::CHUNK_OVERLAP,
        }
    }
}

impl From<&crag_config::ChunkingSettings> for LoaderConfig {
    fn from(settings: &crag_config::ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.overlap,
        }
    }
}

/// One retrievable chunk with its source metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedChunk {
    pub text: String,
    pub file_name: String,
    pub page_label: String,
}

/// A curated knowledge document inside a pack file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Document title, used as the location label
    pub title: String,
    /// Document content
    pub content: String,
    /// Category/type (e.g. "faq", "policy")
    #[serde(default)]
    pub category: Option<String>,
}

/// Knowledge pack file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub version: Option<String>,
    pub documents: Vec<KnowledgeDocument>,
}

/// Document loader
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load one file into chunks with metadata
    ///
    /// Returns `(chunks, page_count)`.
    pub fn load(&self, path: &Path) -> Result<(Vec<LoadedChunk>, usize), RagError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RagError::Loader(format!("Invalid file name: {}", path.display())))?
            .to_string();

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Loader(format!("Failed to read {}: {}", path.display(), e)))?;

        match extension.as_str() {
            "txt" | "md" | "text" | "markdown" => Ok(self.load_text(&file_name, &content)),
            "yaml" | "yml" => {
                let pack: KnowledgeFile = serde_yaml::from_str(&content)
                    .map_err(|e| RagError::Loader(format!("YAML parse error: {}", e)))?;
                Ok(self.load_pack(&file_name, pack))
            },
            "json" => {
                let pack: KnowledgeFile = serde_json::from_str(&content)
                    .map_err(|e| RagError::Loader(format!("JSON parse error: {}", e)))?;
                Ok(self.load_pack(&file_name, pack))
            },
            other => Err(RagError::Loader(format!(
                "Unsupported file type: .{} ({})",
                other,
                path.display()
            ))),
        }
    }

    /// Plain text: form-feed separated pages, fixed-size chunks per page
    fn load_text(&self, file_name: &str, content: &str) -> (Vec<LoadedChunk>, usize) {
        let pages: Vec<&str> = content
            .split('\u{0c}')
            .map(|page| page.trim())
            .filter(|page| !page.is_empty())
            .collect();

        let mut chunks = Vec::new();
        for (index, page) in pages.iter().enumerate() {
            let page_label = (index + 1).to_string();
            for text in self.chunk_text(page) {
                chunks.push(LoadedChunk {
                    text,
                    file_name: file_name.to_string(),
                    page_label: page_label.clone(),
                });
            }
        }

        (chunks, pages.len())
    }

    /// Knowledge pack: each document chunked under its title label
    fn load_pack(&self, file_name: &str, pack: KnowledgeFile) -> (Vec<LoadedChunk>, usize) {
        let mut chunks = Vec::new();
        let pages = pack.documents.len();

        for document in pack.documents {
            for text in self.chunk_text(&document.content) {
                chunks.push(LoadedChunk {
                    text,
                    file_name: file_name.to_string(),
                    page_label: document.title.clone(),
                });
            }
        }

        (chunks, pages)
    }

    /// Fixed-size chunking with overlap
    ///
    /// Windows of `chunk_size` estimated tokens, stepping by
    /// `chunk_size - overlap` so consecutive chunks share context.
    fn chunk_text(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        // Token estimate: words plus a correction for long words
        let words_per_chunk = self.words_for_tokens(&words, self.config.chunk_size);
        let overlap_words = self.words_for_tokens(&words, self.config.overlap);
        let step = words_per_chunk.saturating_sub(overlap_words).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// How many words roughly amount to `tokens` tokens for this text
    fn words_for_tokens(&self, words: &[&str], tokens: usize) -> usize {
        let sample: usize = words.iter().take(200).map(|w| estimate_tokens(w)).sum();
        let sampled_words = words.len().min(200).max(1);
        let tokens_per_word = (sample as f32 / sampled_words as f32).max(1.0);
        ((tokens as f32 / tokens_per_word) as usize).max(1)
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// Estimate tokens for a word (~4 characters per token)
fn estimate_tokens(word: &str) -> usize {
    (word.graphemes(true).count() / 4).max(1)
}
