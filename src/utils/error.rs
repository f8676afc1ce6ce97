// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Could not find CIK for ticker {0}")]
    CikNotFound(String),

    #[error("Could not find specified filing: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

/// Failures of the section extraction pipeline.
///
/// Only `BodyNotFound` and `NoUsableSections` abort a document; the
/// section-level variants are logged and the section is left absent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid section pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("No <TEXT> body found in filing")]
    BodyNotFound,

    #[error("Section {section} not found: {reason}")]
    SectionNotFound { section: String, reason: String },

    #[error("Section {section} has {chars} chars after cleaning, below minimum {min}")]
    InsufficientContent {
        section: String,
        chars: usize,
        min: usize,
    },

    #[error("No usable sections extracted")]
    NoUsableSections,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unrecognised filing file name: {0}")]
    BadFileName(String),

    #[error("Malformed processed artifact: {0}")]
    MalformedArtifact(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
