//! Generator instructions.
use crate::evidence::EvidencePack;

pub const RETRY_DIRECTIVE: &str = "CRITICAL: Your JSON is INVALID unless BOTH 'summary' and 'recommendation' contain at least one bracket citation like [C1]. Fix it now.";

/// System instruction for a pack of `k` entries.
pub fn system_prompt(k: usize) -> String {
    let range = format!("[C1]..[C{}]", k.max(1));
    format!(
        "You are a clinical decision support assistant. Answer ONLY from the EVIDENCE provided by the user.\n\
         \n\
         Return a single JSON object with exactly this schema:\n\
         {{\"quotes\": [{{\"text\": \"...\", \"cite\": \"C1\"}}], \"summary\": \"...\", \"recommendation\": \"...\", \"evidence_level\": \"Low|Moderate|High\"}}\n\
         \n\
         Rules:\n\
         - The only valid citation labels are {range}. Never cite any other label.\n\
         - Include at most 2 quotes. Each quote text must be copied verbatim from the evidence.\n\
         - A quote's \"cite\" is the bare label without brackets, e.g. \"C2\".\n\
         - End every factual sentence in \"summary\" and \"recommendation\" with a bracket citation such as [C1].\n\
         - Do not invent sources, URLs, DOIs or authors.\n\
         - Do not expand acronyms unless the evidence defines them.\n\
         - Output JSON only, with no text before or after it."
    )
}

/// System instruction for the single corrective retry.
pub fn retry_system_prompt(k: usize) -> String { format!("{}\n\n{}", system_prompt(k), RETRY_DIRECTIVE) }

pub fn user_message(question: &str, pack: &EvidencePack) -> String {
    format!("QUESTION:\n{}\n\nEVIDENCE:\n{}", question, pack.evidence_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinrag_core::types::FusedHit;

    #[test]
    fn prompt_names_the_pack_range() {
        let p = system_prompt(3);
        assert!(p.contains("[C1]..[C3]"));
        assert!(!p.contains(RETRY_DIRECTIVE));
        assert!(retry_system_prompt(3).ends_with(RETRY_DIRECTIVE));
    }

    #[test]
    fn user_message_layout() {
        let hit = FusedHit {
            chunk_id: "c".into(),
            doc_id: "d.pdf".into(),
            title: String::new(),
            page: 1,
            text: "Metformin\nfirst".into(),
            vec_n: 1.0,
            bm25_n: 0.0,
            score: 0.6,
        };
        let pack = EvidencePack::assemble(vec![hit], 900);
        assert_eq!(user_message("What first?", &pack), "QUESTION:\nWhat first?\n\nEVIDENCE:\n[C1] Metformin first");
    }
}
