//! Configuration management for the CRAG pipeline
//!
//! Supports loading configuration from:
//! - TOML/YAML files
//! - Environment variables (CRAG_ prefix)
//! - Defaults from the centralized `constants` module

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, ChunkingSettings, EmbeddingSettings, LlmSettings, RetrievalSettings,
    RuntimeEnvironment, ScreenSettings, Settings, VectorStoreSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
