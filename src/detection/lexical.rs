//! Lexical detector: a deterministic phonetic gazetteer.
//!
//! Every lexicon entry is indexed by its phonetic key. The text is scanned
//! left to right and, at each start position, the longest window whose key
//! equals an indexed key becomes a detection. Windows never contain
//! whitespace and never cut through a Latin/digit run, so "北jing" is found
//! as a whole while "jin" inside it is not.
//!
//! Matching is by sound only. A correctly spelled word that shares a key
//! with a lexicon entry is flagged too: with 北京 in the lexicon, 背景 in
//! "这个背景很好" becomes a GPE mention and its top candidate is 北京. Only
//! N-best rejection keeps such a word, when the hypotheses agree on it.

use crate::detection::detector::EntityDetector;
use crate::error::Result;
use crate::phonetic::{is_run_char, push_char_key};
use crate::transcript::EntityEntry;
use crate::types::{Detection, Span};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct LexicalDetector {
    /// Phonetic key to entity type; the first lexicon entry for a key wins.
    types_by_key: HashMap<String, String>,
    /// Longest key in the lexicon, bounds the window search.
    max_key_len: usize,
}

impl LexicalDetector {
    pub fn new(lexicon: &[EntityEntry]) -> Self {
        let mut types_by_key = HashMap::new();
        let mut max_key_len = 0;
        for entry in lexicon {
            let key = crate::phonetic::phonetic_key(&entry.surface);
            if key.is_empty() {
                continue;
            }
            max_key_len = max_key_len.max(key.len());
            types_by_key
                .entry(key)
                .or_insert_with(|| entry.entity_type.clone());
        }
        Self {
            types_by_key,
            max_key_len,
        }
    }

    pub fn len(&self) -> usize {
        self.types_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types_by_key.is_empty()
    }

    /// Longest match starting at char index `start`: `(end_char, entity_type)`.
    fn longest_match(&self, chars: &[(usize, char)], start: usize) -> Option<(usize, &str)> {
        let mut key = String::new();
        let mut best = None;
        for end in start + 1..=chars.len() {
            let c = chars[end - 1].1;
            if c.is_whitespace() {
                break;
            }
            push_char_key(c, &mut key);
            if key.len() > self.max_key_len {
                break;
            }
            let splits_run = end < chars.len() && is_run_char(c) && is_run_char(chars[end].1);
            if splits_run || key.is_empty() {
                continue;
            }
            if let Some(ty) = self.types_by_key.get(&key) {
                best = Some((end, ty.as_str()));
            }
        }
        best
    }
}

impl EntityDetector for LexicalDetector {
    fn detect(&self, text: &str) -> Result<Vec<Detection>> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());

        let mut detections = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i].1;
            let mid_run = i > 0 && is_run_char(c) && is_run_char(chars[i - 1].1);
            if c.is_whitespace() || mid_run || !push_char_key(c, &mut String::new()) {
                i += 1;
                continue;
            }
            match self.longest_match(&chars, i) {
                Some((end, ty)) => {
                    let span = Span::new(byte_at(i), byte_at(end));
                    detections.push(Detection::from_text(text, span, ty)?);
                    i = end;
                }
                None => i += 1,
            }
        }
        Ok(detections)
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
