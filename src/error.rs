//! Error types for entcorrect.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntcorrectError {
    // Configuration errors
    #[error("Unknown detection model type '{value}' (expected one of: model, lexical, oracle)")]
    UnknownDetectorType { value: String },

    #[error("Unknown retrieval model type '{value}' (expected one of: phonetic)")]
    UnknownRetrieverType { value: String },

    #[error("Missing required option --{option}: {reason}")]
    MissingPath { option: String, reason: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input file errors
    #[error("Malformed line {line} in {path}: {message}")]
    TranscriptParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Duplicate utterance id '{id}' in {path}")]
    DuplicateUtterance { id: String, path: String },

    #[error("No reference text for utterance '{id}' in {path}")]
    MissingReference { id: String, path: String },

    #[error("Entity dictionary {path} contains no entries")]
    DictionaryEmpty { path: String },

    // Pipeline contract errors
    #[error("Detector '{detector}' violated its output contract: {message}")]
    ContractViolation { detector: String, message: String },

    #[error("Length mismatch in {stage}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        stage: String,
        expected: usize,
        actual: usize,
    },

    // Detection model errors
    #[error("Failed to load detection model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("Detection model inference failed: {message}")]
    ModelInference { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, EntcorrectError>;
