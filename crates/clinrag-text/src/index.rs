use anyhow::Result;
use std::path::PathBuf;
use tantivy::{doc, Index};
use tracing::info;

use clinrag_core::types::ChunkRecord;

use crate::search::TantivySparseIndex;
use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TantivyChunkIndexer {
	index: Index,
	fields: ChunkFields,
}

impl TantivyChunkIndexer {
	/// Create a fresh on-disk index, replacing whatever is in `index_dir`.
	pub fn create(index_dir: PathBuf) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(&index_dir)?; }
		std::fs::create_dir_all(&index_dir)?;
		Self::from_index(Index::create_in_dir(&index_dir, build_schema())?)
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::resolve(&index.schema())?;
		Ok(Self { index, fields })
	}

	pub fn index(&self, chunks: &[ChunkRecord]) -> Result<usize> {
		let mut index_writer = self.index.writer(WRITER_HEAP_BYTES)?;
		for c in chunks {
			index_writer.add_document(doc!(
				self.fields.chunk_id => c.chunk_id.clone(),
				self.fields.doc_id => c.doc_id.clone(),
				self.fields.title => c.title.clone(),
				self.fields.page => u64::from(c.page),
				self.fields.text => c.text.clone(),
			))?;
		}
		index_writer.commit()?;
		info!(chunks = chunks.len(), "tantivy index committed");
		Ok(chunks.len())
	}

	/// A query handle over everything committed so far.
	pub fn sparse_index(&self) -> Result<TantivySparseIndex> {
		TantivySparseIndex::from_index(self.index.clone())
	}
}
