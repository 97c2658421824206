//! clinrag-answer
//!
//! Citation-constrained answering on top of hybrid retrieval: assemble a
//! labelled evidence pack, ask the generator for a JSON answer, and accept it
//! only if every citation points into the pack.
pub mod citations;
pub mod evidence;
pub mod orchestrator;
pub mod prompt;
pub mod response;

pub use citations::{check_citations, valid, CitationViolation};
pub use evidence::{EvidenceEntry, EvidencePack};
pub use orchestrator::{passes_gate, AnswerOrchestrator, AnswerSettings, Answered, Outcome};
pub use response::{EvidenceLevel, GeneratedAnswer, QueryRequest, QueryResponse, Quote};
