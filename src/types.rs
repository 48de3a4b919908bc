//! Core data types shared by every pipeline stage.
//!
//! Offsets are byte offsets into UTF-8 text and always fall on char
//! boundaries; `text.get(span.range())` is therefore the canonical way to
//! read a span back.

use crate::error::{EntcorrectError, Result};
use serde::Serialize;
use std::ops::Range;

/// One transcript line: an utterance id and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub id: String,
    pub text: String,
}

impl Utterance {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Half-open range `[start, end)` into an utterance's original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Slice `text` by this span; `None` when out of bounds or off a char boundary.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.start > self.end {
            return None;
        }
        text.get(self.range())
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A detected entity mention with its proposed type.
///
/// `mention == text[span]` always holds for detections built through
/// [`Detection::from_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub mention: String,
    pub entity_type: String,
    pub span: Span,
}

impl Detection {
    /// Build a detection by slicing `text`, rejecting spans that do not fit.
    pub fn from_text(text: &str, span: Span, entity_type: impl Into<String>) -> Result<Self> {
        let mention = span.slice(text).ok_or_else(|| EntcorrectError::ContractViolation {
            detector: "unknown".to_string(),
            message: format!(
                "span {} does not fit text of {} bytes on char boundaries",
                span,
                text.len()
            ),
        })?;
        Ok(Self {
            mention: mention.to_string(),
            entity_type: entity_type.into(),
            span,
        })
    }
}

/// Check that `detections` honour the detector contract for `text`.
///
/// Every mention must equal its span's slice, and spans must be ascending
/// and non-overlapping so reconstruction can walk them with a single cursor.
pub fn validate_detections(detector: &str, text: &str, detections: &[Detection]) -> Result<()> {
    let violation = |message: String| EntcorrectError::ContractViolation {
        detector: detector.to_string(),
        message,
    };

    let mut cursor = 0usize;
    for detection in detections {
        let span = detection.span;
        match span.slice(text) {
            Some(slice) if slice == detection.mention => {}
            Some(slice) => {
                return Err(violation(format!(
                    "mention '{}' does not match text '{}' at {}",
                    detection.mention, slice, span
                )));
            }
            None => {
                return Err(violation(format!(
                    "span {} is outside text of {} bytes or splits a character",
                    span,
                    text.len()
                )));
            }
        }
        if span.start < cursor {
            return Err(violation(format!(
                "span {} overlaps or precedes the previous span ending at {}",
                span, cursor
            )));
        }
        cursor = span.end;
    }
    Ok(())
}

/// Fail unless a position-aligned sequence has the expected length.
pub fn ensure_aligned(stage: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(EntcorrectError::LengthMismatch {
            stage: stage.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// A retrieved spelling for a mention, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub score: f32,
    pub text: String,
}

impl Candidate {
    pub fn new(score: f32, text: impl Into<String>) -> Self {
        Self {
            score,
            text: text.into(),
        }
    }
}

/// Candidates for one mention, best first. Empty means "unknown entity".
pub type CandidateList = Vec<Candidate>;

/// Alternate transcriptions of one utterance, in rank order.
pub type NBestHypotheses = Vec<String>;

/// Surface forms observed for one detection's span across the N-best list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SurfaceEvidence {
    /// Distinct aligned surface forms with their counts, in first-seen order.
    pub forms: Vec<(String, usize)>,
    /// Number of hypotheses that were aligned.
    pub hypotheses: usize,
}

impl SurfaceEvidence {
    /// Record one aligned surface form.
    pub fn observe(&mut self, form: &str) {
        self.hypotheses += 1;
        if let Some(entry) = self.forms.iter_mut().find(|(f, _)| f == form) {
            entry.1 += 1;
        } else {
            self.forms.push((form.to_string(), 1));
        }
    }

    /// How many hypotheses reproduced `form` exactly.
    pub fn support_for(&self, form: &str) -> usize {
        self.forms
            .iter()
            .find(|(f, _)| f == form)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses == 0
    }
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Top candidate accepted.
    Accepted,
    /// Retriever returned no candidates.
    NoCandidate,
    /// N-best hypotheses agree with the original mention.
    NbestVeto,
    /// Rejection was enabled but no hypotheses were available.
    NoEvidence,
}

/// Final per-detection outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub span: Span,
    pub mention: String,
    /// Replacement text; equals `mention` when the correction is rejected.
    pub replacement: String,
    pub accepted: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn accept(detection: &Detection, replacement: impl Into<String>) -> Self {
        Self {
            span: detection.span,
            mention: detection.mention.clone(),
            replacement: replacement.into(),
            accepted: true,
            reason: DecisionReason::Accepted,
        }
    }

    pub fn keep(detection: &Detection, reason: DecisionReason) -> Self {
        Self {
            span: detection.span,
            mention: detection.mention.clone(),
            replacement: detection.mention.clone(),
            accepted: false,
            reason,
        }
    }

    /// True when applying this decision changes the text.
    pub fn changes_text(&self) -> bool {
        self.accepted && self.replacement != self.mention
    }
}
