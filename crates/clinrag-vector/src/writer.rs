use anyhow::{bail, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use clinrag_core::types::ChunkRecord;

use crate::schema::build_chunk_schema;
use crate::table::{open_db, remove_local_table, table_exists};

const BATCH_SIZE: usize = 1000;

pub struct LanceChunkWriter { db: Connection, table_name: String, dim: i32 }

impl LanceChunkWriter {
	/// Open `db_path` and drop any previous copy of `table_name`, so the
	/// table is rebuilt from scratch on the first write.
	pub async fn create(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		std::fs::create_dir_all(db_path)?;
		remove_local_table(db_path, table_name)?;
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		Ok(Self { db, table_name: table_name.to_string(), dim: i32::try_from(dim)? })
	}

	pub async fn write(&self, chunks: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<usize> {
		if chunks.is_empty() { info!("no chunks to write"); return Ok(0); }
		if chunks.len() != embeddings.len() { bail!("{} chunks but {} embeddings", chunks.len(), embeddings.len()); }
		if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dim as usize) { bail!("embedding has {} dims, table expects {}", bad.len(), self.dim); }
		info!(chunks = chunks.len(), table = %self.table_name, "writing chunks to LanceDB");
		let pb = ProgressBar::new(chunks.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?.progress_chars("#>-"));
		let mut written = 0usize;
		for (batch_chunks, batch_vectors) in chunks.chunks(BATCH_SIZE).zip(embeddings.chunks(BATCH_SIZE)) {
			self.insert_batch(batch_chunks, batch_vectors).await?;
			written += batch_chunks.len(); pb.set_position(written as u64);
		}
		pb.finish_with_message("LanceDB write completed");
		Ok(written)
	}

	async fn insert_batch(&self, chunks: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<()> {
		let record_batch = self.to_record_batch(chunks, vectors)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(&self.db, &self.table_name).await? {
			self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await?;
		}
		Ok(())
	}

	fn to_record_batch(&self, chunks: &[ChunkRecord], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
		let schema = build_chunk_schema(self.dim);
		let chunk_ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
		let doc_ids: Vec<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
		let titles: Vec<&str> = chunks.iter().map(|c| c.title.as_str()).collect();
		let pages: Vec<u32> = chunks.iter().map(|c| c.page).collect();
		let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
		let vectors = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(chunk_ids)),
			Arc::new(StringArray::from(doc_ids)),
			Arc::new(StringArray::from(titles)),
			Arc::new(UInt32Array::from(pages)),
			Arc::new(StringArray::from(texts)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, self.dim)),
		])?;
		Ok(record_batch)
	}
}
