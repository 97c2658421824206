//! Request and response shapes of the question-answering endpoint, plus the
//! typed view of a validated generator answer.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::citations::parse_label;

pub const NO_EVIDENCE_SUMMARY: &str = "Insufficient evidence found in the current database.";
pub const NO_EVIDENCE_RECOMMENDATION: &str = "Please add more guideline PDFs or refine the question.";
pub const GENERATION_FAILED_RECOMMENDATION: &str =
    "Failed to call the language model or parse its JSON output. Ensure the generator is running.";
pub const INVALID_CITATIONS_RECOMMENDATION: &str = "Model returned invalid JSON or invalid citations. Rejected for safety.";

/// Incoming question. Patient fields are accepted but do not influence
/// retrieval or generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub current_medication: Vec<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self { Self { question: question.into(), ..Self::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl EvidenceLevel {
    /// Generator-provided level; anything unrecognised counts as `Moderate`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Moderate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub summary: String,
    pub recommendation: String,
    pub evidence_level: EvidenceLevel,
    pub confidence_score: f32,
    pub citations: Vec<String>,
}

impl QueryResponse {
    pub fn no_evidence() -> Self {
        Self {
            summary: NO_EVIDENCE_SUMMARY.to_string(),
            recommendation: NO_EVIDENCE_RECOMMENDATION.to_string(),
            evidence_level: EvidenceLevel::NotApplicable,
            confidence_score: 0.0,
            citations: Vec::new(),
        }
    }

    pub fn generation_failed(confidence_score: f32, citations: Vec<String>) -> Self {
        Self {
            summary: NO_EVIDENCE_SUMMARY.to_string(),
            recommendation: GENERATION_FAILED_RECOMMENDATION.to_string(),
            evidence_level: EvidenceLevel::NotApplicable,
            confidence_score,
            citations,
        }
    }

    pub fn invalid_citations(confidence_score: f32, citations: Vec<String>) -> Self {
        Self {
            summary: NO_EVIDENCE_SUMMARY.to_string(),
            recommendation: INVALID_CITATIONS_RECOMMENDATION.to_string(),
            evidence_level: EvidenceLevel::NotApplicable,
            confidence_score,
            citations,
        }
    }
}

/// A verbatim excerpt the generator attributes to one evidence label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    /// Normalised label, e.g. `C2`.
    pub cite: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub quotes: Vec<Quote>,
    pub summary: String,
    pub recommendation: String,
    pub evidence_level: EvidenceLevel,
}

impl GeneratedAnswer {
    /// Typed view of an answer that already passed citation validation.
    /// Fields that validation does not cover fall back to empty values.
    pub fn from_validated(answer: &Value) -> Self {
        let str_field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let quotes = answer
            .get("quotes")
            .and_then(Value::as_array)
            .map(|qs| {
                qs.iter()
                    .map(|q| {
                        let raw = q.get("cite").and_then(Value::as_str).unwrap_or_default();
                        let cite = parse_label(raw).map(|n| format!("C{n}")).unwrap_or_else(|| raw.trim().to_string());
                        Quote { text: str_field(q, "text"), cite }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            quotes,
            summary: str_field(answer, "summary"),
            recommendation: str_field(answer, "recommendation"),
            evidence_level: EvidenceLevel::parse_lenient(answer.get("evidence_level").and_then(Value::as_str)),
        }
    }
}
