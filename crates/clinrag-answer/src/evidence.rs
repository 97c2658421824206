use clinrag_core::types::FusedHit;

/// One labelled entry of an evidence pack.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceEntry {
    /// `C1`, `C2`, ... in fused rank order.
    pub label: String,
    pub hit: FusedHit,
    /// Single-line, length-capped rendering of the chunk text.
    pub snippet: String,
}

impl EvidenceEntry {
    pub fn citation(&self) -> String {
        format!("[{}] {} page {} (chunk={})", self.label, self.hit.doc_id, self.hit.page, self.hit.chunk_id)
    }

    pub fn evidence_line(&self) -> String { format!("[{}] {}", self.label, self.snippet) }
}

/// Ordered evidence handed to the generator. Lives for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidencePack {
    entries: Vec<EvidenceEntry>,
}

impl EvidencePack {
    /// Label fused hits in rank order. The caller passes at most `k_final`
    /// hits; each chunk's text is flattened to one line and cut at
    /// `max_chars` characters.
    pub fn assemble(hits: Vec<FusedHit>, max_chars: usize) -> Self {
        let entries = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| {
                let snippet = single_line_snippet(&hit.text, max_chars);
                EvidenceEntry { label: format!("C{}", i + 1), hit, snippet }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn entries(&self) -> &[EvidenceEntry] { &self.entries }

    pub fn get(&self, label: &str) -> Option<&EvidenceEntry> { self.entries.iter().find(|e| e.label == label) }

    pub fn top_score(&self) -> Option<f32> { self.entries.first().map(|e| e.hit.score) }

    /// Human-readable citation strings, one per entry, in label order.
    pub fn citations(&self) -> Vec<String> { self.entries.iter().map(EvidenceEntry::citation).collect() }

    /// Evidence lines joined by blank lines, as shown to the generator.
    pub fn evidence_text(&self) -> String {
        self.entries.iter().map(EvidenceEntry::evidence_line).collect::<Vec<_>>().join("\n\n")
    }
}

/// Collapse all whitespace runs to single spaces and keep the first
/// `max_chars` characters.
pub fn single_line_snippet(text: &str, max_chars: usize) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(max_chars).collect()
}
