use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use clinrag_core::config::Settings;
use clinrag_core::error::{GenerationError, Result};
use clinrag_core::traits::{DenseIndex, Generator, SparseIndex};
use clinrag_core::types::FusedHit;
use clinrag_hybrid::{FuseParams, HybridFuser};

use crate::citations::{check_citations, CitationViolation};
use crate::evidence::EvidencePack;
use crate::prompt::{retry_system_prompt, system_prompt, user_message};
use crate::response::{GeneratedAnswer, QueryRequest, QueryResponse};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerSettings {
    pub fuse: FuseParams,
    /// Gate: the top fused score must be at least this.
    pub min_top_score: f32,
    pub max_evidence_chars: usize,
    pub generation_timeout: Duration,
}

impl AnswerSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            fuse: FuseParams::from(&settings.retrieval),
            min_top_score: settings.retrieval.min_top_score,
            max_evidence_chars: settings.evidence.max_chars,
            generation_timeout: Duration::from_secs(settings.generator.timeout_secs),
        }
    }
}

impl Default for AnswerSettings {
    fn default() -> Self { Self::from_settings(&Settings::default()) }
}

/// How a request ended.
#[derive(Debug)]
pub enum Outcome {
    NoEvidence,
    GenerationFailed(GenerationError),
    InvalidCitations(CitationViolation),
    Success { answer: GeneratedAnswer, retried: bool },
}

#[derive(Debug)]
pub struct Answered {
    pub pack: EvidencePack,
    /// Top fused score; 0 when the gate rejected the evidence.
    pub confidence: f32,
    pub outcome: Outcome,
}

impl Answered {
    pub fn into_response(self) -> QueryResponse {
        match self.outcome {
            Outcome::NoEvidence => QueryResponse::no_evidence(),
            Outcome::GenerationFailed(_) => QueryResponse::generation_failed(self.confidence, self.pack.citations()),
            Outcome::InvalidCitations(_) => QueryResponse::invalid_citations(self.confidence, self.pack.citations()),
            Outcome::Success { answer, .. } => QueryResponse {
                summary: answer.summary,
                recommendation: answer.recommendation,
                evidence_level: answer.evidence_level,
                confidence_score: self.confidence,
                citations: self.pack.citations(),
            },
        }
    }
}

/// True when the best fused hit clears `min_top_score`. Empty or NaN fails.
pub fn passes_gate(hits: &[FusedHit], min_top_score: f32) -> bool {
    hits.first().is_some_and(|h| h.score >= min_top_score)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// Retrieval, gating, evidence assembly and validated generation for one
/// question at a time. Holds no per-request state, so one instance can
/// serve concurrent requests.
pub struct AnswerOrchestrator<D, S, G> where D: DenseIndex, S: SparseIndex, G: Generator {
    fuser: HybridFuser<D, S>,
    generator: G,
    settings: AnswerSettings,
}

impl<D, S, G> AnswerOrchestrator<D, S, G> where D: DenseIndex, S: SparseIndex, G: Generator {
    pub fn new(fuser: HybridFuser<D, S>, generator: G, settings: AnswerSettings) -> Self { Self { fuser, generator, settings } }

    pub fn settings(&self) -> &AnswerSettings { &self.settings }

    /// Answer `question`. Only retrieval failures are errors; every
    /// generation problem ends in a fallback `Outcome`.
    pub async fn run(&self, question: &str) -> Result<Answered> {
        let hits = self.fuser.fuse(question, &self.settings.fuse).await?;
        if !passes_gate(&hits, self.settings.min_top_score) {
            info!(hits = hits.len(), top_score = hits.first().map(|h| h.score), threshold = self.settings.min_top_score, "insufficient evidence");
            return Ok(Answered { pack: EvidencePack::default(), confidence: 0.0, outcome: Outcome::NoEvidence });
        }

        let pack = EvidencePack::assemble(hits, self.settings.max_evidence_chars);
        let confidence = pack.top_score().unwrap_or(0.0);
        let user = user_message(question, &pack);
        let outcome = self.generate_validated(pack.len(), &user).await;
        match &outcome {
            Outcome::Success { retried, .. } => info!(evidence = pack.len(), confidence, retried, "answer accepted"),
            Outcome::GenerationFailed(e) => warn!(error = %e, "generation failed"),
            Outcome::InvalidCitations(v) => warn!(violation = %v, "answer rejected after retry"),
            Outcome::NoEvidence => {}
        }
        Ok(Answered { pack, confidence, outcome })
    }

    /// `run` folded into the endpoint response.
    pub async fn answer(&self, request: &QueryRequest) -> Result<QueryResponse> {
        debug!(
            patient_age = request.patient_age,
            symptoms = request.symptoms.len(),
            medications = request.current_medication.len(),
            "patient context received but not used"
        );
        Ok(self.run(&request.question).await?.into_response())
    }

    async fn generate_validated(&self, k: usize, user: &str) -> Outcome {
        let first = match self.generate(Attempt::First, k, user).await {
            Ok(v) => v,
            Err(e) => return Outcome::GenerationFailed(e),
        };
        let violation = match check_citations(&first, k) {
            Ok(()) => return Outcome::Success { answer: GeneratedAnswer::from_validated(&first), retried: false },
            Err(v) => v,
        };
        warn!(%violation, "citation check failed, retrying once");

        let second = match self.generate(Attempt::Retry, k, user).await {
            Ok(v) => v,
            Err(e) => return Outcome::GenerationFailed(e),
        };
        match check_citations(&second, k) {
            Ok(()) => Outcome::Success { answer: GeneratedAnswer::from_validated(&second), retried: true },
            Err(v) => Outcome::InvalidCitations(v),
        }
    }

    async fn generate(&self, attempt: Attempt, k: usize, user: &str) -> std::result::Result<Value, GenerationError> {
        let system = match attempt {
            Attempt::First => system_prompt(k),
            Attempt::Retry => retry_system_prompt(k),
        };
        let timeout = self.settings.generation_timeout;
        let value = tokio::time::timeout(timeout, self.generator.complete(&system, user))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;
        debug!(?attempt, raw = %value, "generator output");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fused(score: f32) -> FusedHit {
        FusedHit {
            chunk_id: "c".into(),
            doc_id: "d".into(),
            title: String::new(),
            page: 1,
            text: String::new(),
            vec_n: 0.0,
            bm25_n: 0.0,
            score,
        }
    }

    #[test]
    fn gate_is_inclusive_at_threshold() {
        assert!(passes_gate(&[fused(0.20)], 0.20));
        assert!(!passes_gate(&[fused(0.1999)], 0.20));
        assert!(!passes_gate(&[], 0.20));
        assert!(!passes_gate(&[fused(f32::NAN)], 0.20));
    }

    #[test]
    fn settings_follow_config_defaults() {
        let s = AnswerSettings::default();
        assert_eq!(s.fuse, FuseParams { k_vec: 10, k_bm25: 10, k_final: 5, alpha: 0.6 });
        assert_eq!(s.min_top_score, 0.20);
        assert_eq!(s.max_evidence_chars, 900);
        assert_eq!(s.generation_timeout, Duration::from_secs(120));
    }
}
