//! Phonetic retriever: SymSpell index over entity phonetic keys.
//!
//! Each dictionary entity is encoded with [`phonetic_key`] and the distinct
//! keys are loaded into a SymSpell index. A mention is encoded the same way,
//! looked up within `max_edit_distance`, and every entity sharing a matching
//! key becomes a candidate scored `1 - distance / max(key lengths)`.
//! Candidates are ordered by descending score; equal scores keep dictionary
//! insertion order.

use crate::config::RetrievalConfig;
use crate::error::{EntcorrectError, Result};
use crate::phonetic::phonetic_key;
use crate::retrieval::retriever::EntityRetriever;
use crate::transcript::EntityEntry;
use crate::types::{Candidate, CandidateList};
use std::collections::HashMap;
use symspell::{SymSpell, SymSpellBuilder, UnicodeStringStrategy, Verbosity};

pub struct PhoneticRetriever {
    symspell: SymSpell<UnicodeStringStrategy>,
    /// Entity indices per phonetic key, in insertion order.
    entities_by_key: HashMap<String, Vec<usize>>,
    surfaces: Vec<String>,
    top_k: usize,
    min_score: f32,
    max_edit_distance: i64,
}

impl std::fmt::Debug for PhoneticRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneticRetriever")
            .field("entities", &self.surfaces.len())
            .field("keys", &self.entities_by_key.len())
            .field("top_k", &self.top_k)
            .field("min_score", &self.min_score)
            .finish_non_exhaustive()
    }
}

/// Similarity in `[0, 1]` from an edit distance between two keys.
pub fn score_from_distance(distance: usize, len_a: usize, len_b: usize) -> f32 {
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 0.0;
    }
    1.0 - (distance.min(longest) as f32 / longest as f32)
}

impl PhoneticRetriever {
    pub fn new(entities: &[EntityEntry], config: &RetrievalConfig) -> Result<Self> {
        let mut symspell: SymSpell<UnicodeStringStrategy> = SymSpellBuilder::default()
            .max_dictionary_edit_distance(config.max_edit_distance)
            .prefix_length(crate::defaults::INDEX_PREFIX_LENGTH)
            .build()
            .map_err(|e| EntcorrectError::Other(format!("Failed to build phonetic index: {e}")))?;

        let mut entities_by_key: HashMap<String, Vec<usize>> = HashMap::new();
        let mut surfaces = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = phonetic_key(&entity.surface);
            if key.is_empty() {
                log::debug!("skipping entity '{}' with empty phonetic key", entity.surface);
                continue;
            }
            let index = surfaces.len();
            surfaces.push(entity.surface.clone());
            let slot = entities_by_key.entry(key.clone()).or_default();
            if slot.is_empty() {
                symspell.load_dictionary_line(&format!("{key} 1"), 0, 1, " ");
            }
            slot.push(index);
        }

        log::info!(
            "phonetic index: {} entities under {} keys",
            surfaces.len(),
            entities_by_key.len()
        );

        Ok(Self {
            symspell,
            entities_by_key,
            surfaces,
            top_k: config.top_k,
            min_score: config.min_score,
            max_edit_distance: config.max_edit_distance,
        })
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl EntityRetriever for PhoneticRetriever {
    fn lookup(&self, mention: &str) -> CandidateList {
        let key = phonetic_key(mention);
        if key.is_empty() {
            return Vec::new();
        }
        let key_len = key.chars().count();

        let mut scored: Vec<(f32, usize)> = Vec::new();
        for suggestion in self
            .symspell
            .lookup(&key, Verbosity::All, self.max_edit_distance)
        {
            let Some(indices) = self.entities_by_key.get(suggestion.term.as_str()) else {
                continue;
            };
            let distance = usize::try_from(suggestion.distance).unwrap_or(usize::MAX);
            let score = score_from_distance(distance, key_len, suggestion.term.chars().count());
            if score < self.min_score {
                continue;
            }
            scored.extend(indices.iter().map(|&index| (score, index)));
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(score, index)| Candidate::new(score, self.surfaces[index].clone()))
            .collect()
    }

    fn name(&self) -> &str {
        "phonetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(surface: &str, ty: &str) -> EntityEntry {
        EntityEntry {
            surface: surface.to_string(),
            entity_type: ty.to_string(),
        }
    }

    fn retriever(entities: &[EntityEntry]) -> PhoneticRetriever {
        PhoneticRetriever::new(entities, &RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn exact_phonetic_match_scores_one() {
        let r = retriever(&[entry("北京", "GPE"), entry("上海", "GPE")]);
        let candidates = r.lookup("北jing");
        assert_eq!(candidates, vec![Candidate::new(1.0, "北京")]);
    }

    #[test]
    fn near_match_scores_by_edit_distance() {
        let r = retriever(&[entry("北京", "GPE")]);
        let candidates = r.lookup("北jin");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "北京");
        assert!((candidates[0].score - (1.0 - 1.0 / 7.0)).abs() < 1e-6);
    }

    #[test]
    fn unknown_mention_returns_empty_list() {
        let r = retriever(&[entry("北京", "GPE")]);
        assert!(r.lookup("你好吗").is_empty());
        assert!(r.lookup("，").is_empty());
    }

    #[test]
    fn ties_keep_dictionary_insertion_order() {
        let r = retriever(&[entry("北京", "GPE"), entry("背景", "MISC")]);
        let texts: Vec<_> = r.lookup("北jing").into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["北京", "背景"]);

        let r = retriever(&[entry("背景", "MISC"), entry("北京", "GPE")]);
        let texts: Vec<_> = r.lookup("北jing").into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["背景", "北京"]);
    }

    #[test]
    fn higher_score_ranks_first() {
        let r = retriever(&[entry("北进", "MISC"), entry("北京", "GPE")]);
        let candidates = r.lookup("北京");
        assert_eq!(candidates[0].text, "北京");
        assert_eq!(candidates[1].text, "北进");
        assert!(candidates[0].score > candidates[1].score);
    }

    #[test]
    fn retrieve_is_position_aligned_with_duplicates() {
        let r = retriever(&[entry("北京", "GPE"), entry("上海", "GPE")]);
        let results = r.retrieve(&["尚海", "北jing", "尚海"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0][0].text, "上海");
        assert_eq!(results[1][0].text, "北京");
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn top_k_limits_candidates() {
        let config = RetrievalConfig {
            top_k: 1,
            ..RetrievalConfig::default()
        };
        let r = PhoneticRetriever::new(&[entry("北京", "GPE"), entry("背景", "MISC")], &config)
            .unwrap();
        assert_eq!(r.lookup("北jing").len(), 1);
    }

    #[test]
    fn min_score_filters_weak_candidates() {
        let config = RetrievalConfig {
            min_score: 0.95,
            ..RetrievalConfig::default()
        };
        let r = PhoneticRetriever::new(&[entry("北京", "GPE")], &config).unwrap();
        assert!(r.lookup("北jin").is_empty());
        assert_eq!(r.lookup("北jing").len(), 1);
    }

    #[test]
    fn score_from_distance_bounds() {
        assert_eq!(score_from_distance(0, 7, 7), 1.0);
        assert_eq!(score_from_distance(7, 7, 3), 0.0);
        assert_eq!(score_from_distance(0, 0, 0), 0.0);
    }

    #[test]
    fn retriever_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PhoneticRetriever>();
    }
}
