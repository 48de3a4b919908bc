//! Candidate retrieval from the known-entity dictionary.

pub mod phonetic_index;
pub mod retriever;
