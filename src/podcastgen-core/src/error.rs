//! Error types for the podcast pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodcastError {
    #[error("No audio file matching '{pattern}' found in {dir}")]
    NoAudioFile { dir: String, pattern: String },

    #[error("No news items could be fetched from any source")]
    NoNews,

    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("TTS error: {0}")]
    TtsError(String),

    #[error("Feed error: {0}")]
    FeedError(#[from] FeedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Errors raised while reading or writing a feed document.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Unexpected document structure: {0}")]
    Structure(String),

    #[error("Failed to write document: {0}")]
    Write(#[from] std::io::Error),
}
