//! Correction pipeline: detect, retrieve, optionally reject, reconstruct.
//!
//! Utterances are independent, so a batch is spread across the rayon pool;
//! results come back in input order. The detector, retriever and entity
//! index are read-only after construction and shared without locks.

use crate::config::{RejectionConfig, RunPlan};
use crate::detection::detector::Detector;
use crate::error::{EntcorrectError, Result};
use crate::reconstruct::reconstruct;
use crate::rejection::confirmer::NbestConfirmer;
use crate::rejection::rejector::{NbestRejector, accept_top};
use crate::retrieval::retriever::Retriever;
use crate::transcript::EntityEntry;
use crate::types::{Decision, NBestHypotheses, Utterance, ensure_aligned};
use rayon::prelude::*;
use serde::Serialize;

/// Outcome for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionRecord {
    pub id: String,
    pub original: String,
    pub corrected: String,
    pub decisions: Vec<Decision>,
}

impl CorrectionRecord {
    pub fn changed(&self) -> bool {
        self.decisions.iter().any(Decision::changes_text)
    }
}

#[derive(Debug)]
struct Rejection {
    confirmer: NbestConfirmer,
    rejector: NbestRejector,
}

#[derive(Debug)]
pub struct Pipeline {
    detector: Detector,
    retriever: Retriever,
    rejection: Option<Rejection>,
}

impl Pipeline {
    pub fn new(detector: Detector, retriever: Retriever) -> Self {
        Self {
            detector,
            retriever,
            rejection: None,
        }
    }

    /// Enable N-best rejection with the given policy.
    pub fn with_rejection(mut self, config: &RejectionConfig) -> Self {
        self.rejection = Some(Rejection {
            confirmer: NbestConfirmer::new(),
            rejector: NbestRejector::new(config.veto_ratio),
        });
        self
    }

    /// Build the strategies a validated run selected.
    pub fn build(plan: &RunPlan, entities: &[EntityEntry]) -> Result<Self> {
        let detector = Detector::build(plan.detector, &plan.detection_model_path, entities)?;
        let retriever = Retriever::build(plan.retriever, entities, &plan.tuning.retrieval)?;
        log::info!(
            "pipeline: detector={} retriever={} rejection={}",
            detector.name(),
            retriever.name(),
            plan.nbest_path.is_some()
        );
        let pipeline = Self::new(detector, retriever);
        Ok(if plan.nbest_path.is_some() {
            pipeline.with_rejection(&plan.tuning.rejection)
        } else {
            pipeline
        })
    }

    pub fn rejection_enabled(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Correct one utterance.
    ///
    /// `reference` feeds the oracle detector; `hypotheses` is only read when
    /// rejection is enabled.
    pub fn correct(
        &self,
        text: &str,
        reference: Option<&str>,
        hypotheses: &[String],
    ) -> Result<(String, Vec<Decision>)> {
        let detections = self.detector.detect(text, reference)?;
        if detections.is_empty() {
            return Ok((text.to_string(), Vec::new()));
        }

        let mentions: Vec<&str> = detections.iter().map(|d| d.mention.as_str()).collect();
        let candidates = self.retriever.retrieve(&mentions);
        ensure_aligned("retrieval", detections.len(), candidates.len())?;

        let decisions = match &self.rejection {
            Some(rejection) => {
                let evidence = rejection
                    .confirmer
                    .confirm_utterance(text, hypotheses, &detections);
                rejection.rejector.reject(&detections, &evidence, &candidates)?
            }
            None => accept_top(&detections, &candidates)?,
        };

        for decision in &decisions {
            log::debug!(
                "{} '{}' -> '{}' ({:?})",
                decision.span,
                decision.mention,
                decision.replacement,
                decision.reason
            );
        }

        Ok((reconstruct(text, &decisions), decisions))
    }

    /// Correct a batch in parallel, preserving input order.
    ///
    /// `references` and `nbests`, when given, must be position-aligned with
    /// `utterances`. `on_done` is called once per finished utterance.
    pub fn correct_batch(
        &self,
        utterances: &[Utterance],
        references: Option<&[String]>,
        nbests: Option<&[NBestHypotheses]>,
        on_done: &(dyn Fn() + Sync),
    ) -> Result<Vec<CorrectionRecord>> {
        if let Some(references) = references {
            ensure_aligned("reference manuscript", utterances.len(), references.len())?;
        } else if self.detector.requires_reference() {
            return Err(EntcorrectError::MissingPath {
                option: "asr-manuscript-path".to_string(),
                reason: format!("detector '{}' needs reference text", self.detector.name()),
            });
        }
        if self.rejection.is_some() {
            let supplied = nbests.map_or(0, <[NBestHypotheses]>::len);
            ensure_aligned("n-best hypotheses", utterances.len(), supplied)?;
        }

        let records = utterances
            .par_iter()
            .enumerate()
            .map(|(i, utterance)| {
                let reference = references.map(|r| r[i].as_str());
                let hypotheses = nbests.map_or(&[][..], |n| n[i].as_slice());
                let (corrected, decisions) = self.correct(&utterance.text, reference, hypotheses)?;
                on_done();
                Ok(CorrectionRecord {
                    id: utterance.id.clone(),
                    original: utterance.text.clone(),
                    corrected,
                    decisions,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let changed = records.iter().filter(|r| r.changed()).count();
        log::info!(
            "corrected {} of {} utterances ({} detections)",
            changed,
            records.len(),
            records.iter().map(|r| r.decisions.len()).sum::<usize>()
        );
        Ok(records)
    }
}
