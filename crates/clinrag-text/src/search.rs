use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::{Index, IndexReader, TantivyDocument};
use tracing::debug;

use clinrag_core::traits::SparseIndex;
use clinrag_core::types::{ChunkRecord, ScoredHit};

use crate::tantivy_utils::{register_tokenizer, ChunkFields};

/// Read-only BM25 view over a chunk index. Cheap to share between queries.
pub struct TantivySparseIndex {
	reader: IndexReader,
	query_parser: QueryParser,
	analyzer: TextAnalyzer,
	fields: ChunkFields,
}

impl TantivySparseIndex {
	pub fn open(index_dir: &Path) -> Result<Self> {
		Self::from_index(Index::open_in_dir(index_dir)?)
	}

	pub fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::resolve(&index.schema())?;
		let reader = index.reader()?;
		let query_parser = QueryParser::for_index(&index, vec![fields.text]);
		let analyzer = index.tokenizer_for_field(fields.text)?;
		Ok(Self { reader, query_parser, analyzer, fields })
	}

	/// Whether any token of `text` survives the text field's analyzer.
	/// Without one the lenient parser degrades to a match-all query.
	fn has_terms(&self, text: &str) -> bool {
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		stream.advance()
	}

	fn to_chunk(&self, doc: &TantivyDocument) -> ChunkRecord {
		let text_of = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let page = doc.get_first(self.fields.page).and_then(|v| v.as_u64()).unwrap_or(0);
		ChunkRecord {
			doc_id: text_of(self.fields.doc_id),
			title: text_of(self.fields.title),
			page: u32::try_from(page).unwrap_or(u32::MAX),
			chunk_id: text_of(self.fields.chunk_id),
			text: text_of(self.fields.text),
		}
	}
}

impl SparseIndex for TantivySparseIndex {
	fn query(&self, text: &str, limit: usize) -> Result<Vec<ScoredHit>> {
		if limit == 0 { return Ok(Vec::new()); }
		if !self.has_terms(text) {
			debug!("no searchable terms after stop-word filtering");
			return Ok(Vec::new());
		}
		// Questions routinely carry `?`, `:` or stray quotes; never fail on syntax.
		let (q, errors) = self.query_parser.parse_query_lenient(text);
		if !errors.is_empty() { debug!(errors = errors.len(), "lenient query parse dropped fragments"); }
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(ScoredHit::sparse(self.to_chunk(&doc), score));
		}
		Ok(hits)
	}
}
