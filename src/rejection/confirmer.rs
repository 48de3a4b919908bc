//! N-best confirmer: how do the alternate hypotheses spell each detection?
//!
//! Each hypothesis is aligned to the primary text once, every detection's
//! span is carried over, and the aligned surface form is tallied. Text the
//! hypothesis inserts next to a span is not part of its surface form. No
//! detection model or retrieval runs here.

use crate::alignment::{CharAlignment, trim_span};
use crate::error::Result;
use crate::types::{Detection, NBestHypotheses, SurfaceEvidence, ensure_aligned};

/// Stateless N-best confirmer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NbestConfirmer;

impl NbestConfirmer {
    pub fn new() -> Self {
        Self
    }

    /// Evidence for each detection of one utterance, position-aligned with `detections`.
    pub fn confirm_utterance(
        &self,
        text: &str,
        hypotheses: &[String],
        detections: &[Detection],
    ) -> Vec<SurfaceEvidence> {
        let mut evidence = vec![SurfaceEvidence::default(); detections.len()];
        if detections.is_empty() {
            return evidence;
        }
        for hypothesis in hypotheses {
            let alignment = CharAlignment::new(text, hypothesis);
            for (detection, slot) in detections.iter().zip(evidence.iter_mut()) {
                let form = alignment
                    .map_span_tight(detection.span)
                    .map(|span| trim_span(hypothesis, span))
                    .and_then(|span| span.slice(hypothesis))
                    .unwrap_or("");
                slot.observe(form);
            }
        }
        evidence
    }

    /// Evidence for a batch, one entry per utterance.
    ///
    /// `texts`, `nbests` and `detections` must be position-aligned.
    pub fn confirm(
        &self,
        texts: &[&str],
        nbests: &[NBestHypotheses],
        detections: &[Vec<Detection>],
    ) -> Result<Vec<Vec<SurfaceEvidence>>> {
        ensure_aligned("n-best hypotheses", texts.len(), nbests.len())?;
        ensure_aligned("n-best detections", texts.len(), detections.len())?;
        Ok(texts
            .iter()
            .zip(nbests)
            .zip(detections)
            .map(|((text, hypotheses), dets)| self.confirm_utterance(text, hypotheses, dets))
            .collect())
    }
}
