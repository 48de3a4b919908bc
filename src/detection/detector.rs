//! Detector contract and the closed set of detector variants.
//!
//! Variants are picked once, from a string tag, when the pipeline is built.
//! An unknown tag is a configuration error at that point rather than a
//! missing detector discovered mid-batch.

use crate::detection::lexical::LexicalDetector;
use crate::detection::model::ModelDetector;
use crate::detection::oracle::OracleDetector;
use crate::error::{EntcorrectError, Result};
use crate::transcript::{EntityEntry, read_entity_dictionary};
use crate::types::{Detection, validate_detections};
use std::path::Path;
use std::str::FromStr;

/// Trait for detectors that work from the utterance text alone.
pub trait EntityDetector: Send + Sync {
    /// Detect entity mentions in `text`, in ascending non-overlapping span order.
    fn detect(&self, text: &str) -> Result<Vec<Detection>>;

    /// Return the name of this detector for logging.
    fn name(&self) -> &str;
}

/// Detector tag as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorType {
    /// Statistical sequence tagger (BERT token classification).
    Model,
    /// Deterministic phonetic gazetteer.
    Lexical,
    /// Reference-diff detector for upper-bound evaluation.
    Oracle,
}

impl FromStr for DetectorType {
    type Err = EntcorrectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" | "bert" | "bert_detector" => Ok(Self::Model),
            "lexical" | "ckip" | "ckip_detector" => Ok(Self::Lexical),
            "oracle" | "cheat" | "cheat_detector" => Ok(Self::Oracle),
            _ => Err(EntcorrectError::UnknownDetectorType {
                value: s.to_string(),
            }),
        }
    }
}

impl DetectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Lexical => "lexical",
            Self::Oracle => "oracle",
        }
    }
}

/// The detector selected for a run.
pub enum Detector {
    Model(ModelDetector),
    Lexical(LexicalDetector),
    Oracle(OracleDetector),
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Detector").field(&self.name()).finish()
    }
}

impl Detector {
    /// Build the detector for `kind`.
    ///
    /// `model_path` is the BERT model directory (or hub repo id) for the model
    /// detector and an optional lexicon file for the lexical detector; the
    /// entity dictionary is the fallback lexicon and the oracle's entity list.
    pub fn build(kind: DetectorType, model_path: &Path, entities: &[EntityEntry]) -> Result<Self> {
        match kind {
            DetectorType::Model => Self::build_model(model_path),
            DetectorType::Lexical => {
                if model_path.is_file() {
                    let lexicon = read_entity_dictionary(model_path)?;
                    log::info!(
                        "lexical detector: {} entries from {}",
                        lexicon.len(),
                        model_path.display()
                    );
                    Ok(Self::Lexical(LexicalDetector::new(&lexicon)))
                } else {
                    log::info!(
                        "lexical detector: using entity dictionary ({} entries) as lexicon",
                        entities.len()
                    );
                    Ok(Self::Lexical(LexicalDetector::new(entities)))
                }
            }
            DetectorType::Oracle => Ok(Self::Oracle(OracleDetector::new(entities))),
        }
    }

    #[cfg(feature = "bert")]
    fn build_model(model_path: &Path) -> Result<Self> {
        let tagger = crate::detection::bert::BertTagger::load(model_path)?;
        Ok(Self::Model(ModelDetector::new(Box::new(tagger))))
    }

    #[cfg(not(feature = "bert"))]
    fn build_model(_model_path: &Path) -> Result<Self> {
        Err(EntcorrectError::ConfigInvalidValue {
            key: "detection-model-type".to_string(),
            message: "the model detector requires building with the `bert` feature".to_string(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Model(d) => d.name(),
            Self::Lexical(d) => d.name(),
            Self::Oracle(_) => "oracle",
        }
    }

    /// True when detection needs the reference manuscript.
    pub fn requires_reference(&self) -> bool {
        matches!(self, Self::Oracle(_))
    }

    /// Detect mentions in `text` and check the output contract.
    ///
    /// `reference` is consulted only by the oracle variant, which fails
    /// without it.
    pub fn detect(&self, text: &str, reference: Option<&str>) -> Result<Vec<Detection>> {
        let detections = match self {
            Self::Model(d) => d.detect(text)?,
            Self::Lexical(d) => d.detect(text)?,
            Self::Oracle(d) => {
                let reference = reference.ok_or_else(|| EntcorrectError::MissingPath {
                    option: "asr-manuscript-path".to_string(),
                    reason: "the oracle detector needs a reference text per utterance".to_string(),
                })?;
                d.detect_against(reference, text)?
            }
        };
        validate_detections(self.name(), text, &detections)?;
        Ok(detections)
    }
}
