use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray, UInt32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use tracing::debug;

use clinrag_core::traits::DenseIndex;
use clinrag_core::types::{ChunkRecord, ScoredHit};

use crate::table::open_db;

/// Cosine nearest-neighbour search over a chunk table.
///
/// Scores are cosine similarities (`1 - cosine distance`), so they share the
/// scale of the original embedding space and may be negative.
pub struct LanceDenseIndex { db: Connection, table_name: String }

impl LanceDenseIndex {
	pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		Ok(Self { db, table_name: table_name.to_string() })
	}
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("column '{}' missing or of unexpected type", name))
}

fn batch_to_hits(batch: &RecordBatch, hits: &mut Vec<ScoredHit>) -> Result<()> {
	let chunk_ids = column::<StringArray>(batch, "chunk_id")?;
	let doc_ids = column::<StringArray>(batch, "doc_id")?;
	let titles = column::<StringArray>(batch, "title")?;
	let pages = column::<UInt32Array>(batch, "page")?;
	let texts = column::<StringArray>(batch, "text")?;
	let distances = column::<Float32Array>(batch, "_distance")?;
	for i in 0..batch.num_rows() {
		let chunk = ChunkRecord {
			doc_id: doc_ids.value(i).to_string(),
			title: titles.value(i).to_string(),
			page: pages.value(i),
			chunk_id: if chunk_ids.is_null(i) { String::new() } else { chunk_ids.value(i).to_string() },
			text: texts.value(i).to_string(),
		};
		hits.push(ScoredHit::dense(chunk, 1.0 - distances.value(i)));
	}
	Ok(())
}

impl DenseIndex for LanceDenseIndex {
	async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredHit>> {
		if limit == 0 { return Ok(Vec::new()); }
		let table = self.db.open_table(&self.table_name).execute().await?;
		let mut stream = table.vector_search(vector.to_vec())?.distance_type(DistanceType::Cosine).limit(limit).execute().await?;
		let mut hits = Vec::with_capacity(limit);
		while let Some(batch) = stream.try_next().await? { batch_to_hits(&batch, &mut hits)?; }
		// Batches may arrive unordered across fragments.
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(limit);
		debug!(hits = hits.len(), table = %self.table_name, "dense query");
		Ok(hits)
	}
}
