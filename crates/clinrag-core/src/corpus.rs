//! Reading the chunk records handed over by ingestion.
//!
//! The corpus is a JSON-lines file with one `ChunkRecord` per line. Blank
//! lines are ignored.
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::types::ChunkRecord;

pub fn load_chunks(path: &Path) -> Result<Vec<ChunkRecord>> {
    if !path.is_file() { return Err(Error::NotFound(format!("corpus file {}", path.display())).into()); }
    let raw = fs::read_to_string(path).with_context(|| format!("reading corpus {}", path.display()))?;
    parse_chunks(&raw).with_context(|| format!("parsing corpus {}", path.display()))
}

pub fn parse_chunks(raw: &str) -> Result<Vec<ChunkRecord>> {
    let mut chunks = Vec::new();
    let mut seen = HashSet::new();
    for (i, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() { continue; }
        let chunk: ChunkRecord = serde_json::from_str(line).with_context(|| format!("line {}: malformed chunk record", i + 1))?;
        if chunk.chunk_id.is_empty() {
            anyhow::bail!("line {}: chunk_id must not be empty", i + 1);
        }
        if !seen.insert(chunk.chunk_id.clone()) {
            anyhow::bail!("line {}: duplicate chunk_id '{}'", i + 1, chunk.chunk_id);
        }
        chunks.push(chunk);
    }
    Ok(chunks)
}
