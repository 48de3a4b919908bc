//! Retriever contract and the closed set of retriever variants.

use crate::config::RetrievalConfig;
use crate::error::{EntcorrectError, Result};
use crate::retrieval::phonetic_index::PhoneticRetriever;
use crate::transcript::EntityEntry;
use crate::types::CandidateList;
use std::str::FromStr;

/// Trait for mention-to-candidates lookup.
pub trait EntityRetriever: Send + Sync {
    /// Candidates for a single mention, best first.
    fn lookup(&self, mention: &str) -> CandidateList;

    /// Candidates for each mention, position-aligned with `mentions`.
    ///
    /// Duplicate mentions each get their own (identical) list.
    fn retrieve(&self, mentions: &[&str]) -> Vec<CandidateList> {
        mentions.iter().map(|mention| self.lookup(mention)).collect()
    }

    /// Return the name of this retriever for logging.
    fn name(&self) -> &str;
}

/// Retriever tag as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieverType {
    Phonetic,
}

impl FromStr for RetrieverType {
    type Err = EntcorrectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phonetic" | "pinyin" | "pinyin_retriever" => Ok(Self::Phonetic),
            _ => Err(EntcorrectError::UnknownRetrieverType {
                value: s.to_string(),
            }),
        }
    }
}

impl RetrieverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phonetic => "phonetic",
        }
    }
}

/// The retriever selected for a run.
#[derive(Debug)]
pub enum Retriever {
    Phonetic(PhoneticRetriever),
}

impl Retriever {
    pub fn build(
        kind: RetrieverType,
        entities: &[EntityEntry],
        config: &RetrievalConfig,
    ) -> Result<Self> {
        match kind {
            RetrieverType::Phonetic => {
                Ok(Self::Phonetic(PhoneticRetriever::new(entities, config)?))
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Phonetic(r) => r.name(),
        }
    }

    pub fn retrieve(&self, mentions: &[&str]) -> Vec<CandidateList> {
        match self {
            Self::Phonetic(r) => r.retrieve(mentions),
        }
    }
}
