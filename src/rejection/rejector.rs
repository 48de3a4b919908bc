//! Rejection policy: decide per detection whether to apply its top candidate.
//!
//! Order of checks:
//! 1. no candidates: keep the original mention
//! 2. rejection enabled with zero hypotheses: keep the original
//! 3. more than `veto_ratio` of the hypotheses reproduce the mention: veto
//! 4. otherwise accept the top candidate

use crate::error::Result;
use crate::types::{
    CandidateList, Decision, DecisionReason, Detection, SurfaceEvidence, ensure_aligned,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NbestRejector {
    veto_ratio: f32,
}

impl NbestRejector {
    pub fn new(veto_ratio: f32) -> Self {
        Self { veto_ratio }
    }

    pub fn veto_ratio(&self) -> f32 {
        self.veto_ratio
    }

    /// True when the N-best list confirms `mention` as it was transcribed.
    pub fn is_confirmed(&self, mention: &str, evidence: &SurfaceEvidence) -> bool {
        if evidence.is_empty() {
            return false;
        }
        let support = evidence.support_for(mention) as f32 / evidence.hypotheses as f32;
        support > self.veto_ratio
    }

    pub fn decide(
        &self,
        detection: &Detection,
        evidence: &SurfaceEvidence,
        candidates: &CandidateList,
    ) -> Decision {
        let Some(top) = candidates.first() else {
            return Decision::keep(detection, DecisionReason::NoCandidate);
        };
        if evidence.is_empty() {
            return Decision::keep(detection, DecisionReason::NoEvidence);
        }
        if self.is_confirmed(&detection.mention, evidence) {
            return Decision::keep(detection, DecisionReason::NbestVeto);
        }
        Decision::accept(detection, top.text.clone())
    }

    /// Decisions for one utterance; all three slices must be position-aligned.
    pub fn reject(
        &self,
        detections: &[Detection],
        evidence: &[SurfaceEvidence],
        candidates: &[CandidateList],
    ) -> Result<Vec<Decision>> {
        ensure_aligned("rejection evidence", detections.len(), evidence.len())?;
        ensure_aligned("rejection candidates", detections.len(), candidates.len())?;
        Ok(detections
            .iter()
            .zip(evidence)
            .zip(candidates)
            .map(|((detection, ev), cands)| self.decide(detection, ev, cands))
            .collect())
    }
}

/// Decisions with rejection disabled: the top candidate always wins, and an
/// empty candidate list keeps the original mention.
pub fn accept_top(detections: &[Detection], candidates: &[CandidateList]) -> Result<Vec<Decision>> {
    ensure_aligned("retrieval", detections.len(), candidates.len())?;
    Ok(detections
        .iter()
        .zip(candidates)
        .map(|(detection, cands)| match cands.first() {
            Some(top) => Decision::accept(detection, top.text.clone()),
            None => Decision::keep(detection, DecisionReason::NoCandidate),
        })
        .collect())
}
