//! Oracle detector: derives detections from a known-correct reference.
//!
//! Dictionary entities are located in the reference manuscript, carried
//! over to the ASR text through a character alignment, and reported
//! wherever the ASR surface differs from the reference entity. Only meant
//! for upper-bound evaluation runs.

use crate::alignment::{CharAlignment, trim_span};
use crate::error::Result;
use crate::transcript::EntityEntry;
use crate::types::{Detection, Span};

#[derive(Debug, Clone)]
pub struct OracleDetector {
    /// Entities sorted by descending surface length (stable), for longest match.
    entities: Vec<EntityEntry>,
}

impl OracleDetector {
    pub fn new(entities: &[EntityEntry]) -> Self {
        let mut entities: Vec<EntityEntry> = entities
            .iter()
            .filter(|e| !e.surface.is_empty())
            .cloned()
            .collect();
        entities.sort_by(|a, b| b.surface.len().cmp(&a.surface.len()));
        Self { entities }
    }

    /// Leftmost-longest exact occurrences of dictionary entities in `reference`.
    fn locate(&self, reference: &str) -> Vec<(Span, &EntityEntry)> {
        let mut found = Vec::new();
        let mut pos = 0;
        while pos < reference.len() {
            let rest = &reference[pos..];
            match self.entities.iter().find(|e| rest.starts_with(&e.surface)) {
                Some(entity) => {
                    found.push((Span::new(pos, pos + entity.surface.len()), entity));
                    pos += entity.surface.len();
                }
                None => {
                    pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
                }
            }
        }
        found
    }

    /// Detect mentions in `text` that differ from the entities in `reference`.
    pub fn detect_against(&self, reference: &str, text: &str) -> Result<Vec<Detection>> {
        let located = self.locate(reference);
        if located.is_empty() {
            return Ok(Vec::new());
        }

        let alignment = CharAlignment::new(reference, text);
        let mut detections = Vec::new();
        let mut cursor = 0usize;
        for (ref_span, entity) in located {
            let Some(mapped) = alignment.map_span(ref_span) else {
                continue;
            };
            let mapped = trim_span(text, Span::new(mapped.start.max(cursor), mapped.end));
            if mapped.is_empty() {
                continue;
            }
            let detection = Detection::from_text(text, mapped, entity.entity_type.clone())?;
            if detection.mention == entity.surface {
                continue;
            }
            cursor = mapped.end;
            detections.push(detection);
        }
        Ok(detections)
    }
}
