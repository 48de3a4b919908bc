//! entcorrect - named-entity correction for ASR transcripts
//!
//! Detects entity mentions in recognised text, looks up phonetically similar
//! entries in an entity dictionary, optionally vetoes corrections the N-best
//! hypotheses do not support, and splices the survivors back into the text.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod alignment;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod detection;
pub mod error;
pub mod phonetic;
pub mod pipeline;
pub mod reconstruct;
pub mod rejection;
pub mod retrieval;
pub mod run;
pub mod transcript;
pub mod types;

// Stage contracts
pub use detection::detector::{Detector, DetectorType, EntityDetector};
pub use retrieval::retriever::{EntityRetriever, Retriever, RetrieverType};

// Pipeline
pub use pipeline::{CorrectionRecord, Pipeline};
pub use reconstruct::reconstruct;

// Error handling
pub use error::{EntcorrectError, Result};

// Config
pub use config::{Config, RunConfig, RunPlan};

// Data types
pub use types::{Candidate, CandidateList, Decision, DecisionReason, Detection, Span, Utterance};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
