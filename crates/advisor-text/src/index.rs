use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexWriter, TantivyDocument, Term};
use tracing::{debug, info};

use advisor_core::traits::LexicalIndex;
use advisor_core::types::{Channel, Chunk, ChunkRef, SearchHit};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// BM25 keyword index over chunk text. Documents are keyed by
/// `"<source>#<index>"` and never rewritten once added.
pub struct TantivyLexicalIndex {
	index: Index,
	id_field: Field,
	source_field: Field,
	chunk_index_field: Field,
	text_field: Field,
	write_lock: Mutex<()>,
}

impl TantivyLexicalIndex {
	/// Opens the index at `index_dir`, creating an empty one if none exists.
	pub fn open_or_create(index_dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let dir = MmapDirectory::open(index_dir)?;
		let index = Index::open_or_create(dir, build_schema())?;
		Self::from_index(index)
	}

	/// Opens an existing index; fails when it has not been built yet.
	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir).map_err(|e| anyhow!("lexical index at {} not available: {}", index_dir.display(), e))?;
		Self::from_index(index)
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let source_field = schema.get_field("source")?;
		let chunk_index_field = schema.get_field("chunk_index")?;
		let text_field = schema.get_field("text")?;
		Ok(Self { index, id_field, source_field, chunk_index_field, text_field, write_lock: Mutex::new(()) })
	}

	pub fn num_docs(&self) -> Result<u64> {
		Ok(self.index.reader()?.searcher().num_docs())
	}

	fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
		let _guard = self.write_lock.lock().map_err(|_| anyhow!("lexical index writer lock poisoned"))?;
		let searcher = self.index.reader()?.searcher();
		let mut index_writer: IndexWriter = self.index.writer(50_000_000)?;
		let mut seen = HashSet::new();
		let mut added = 0usize;
		for c in chunks {
			let key = c.chunk_ref().key();
			if !seen.insert(key.clone()) { continue; }
			if searcher.doc_freq(&Term::from_field_text(self.id_field, &key))? > 0 { continue; }
			index_writer.add_document(doc!(
				self.id_field => key,
				self.source_field => c.source.clone(),
				self.chunk_index_field => c.index as u64,
				self.text_field => c.text.clone(),
			))?;
			added += 1;
		}
		index_writer.commit()?;
		info!("Lexical index: added {} of {} chunks", added, chunks.len());
		Ok(added)
	}

	fn search_chunks(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 { return Ok(Vec::new()); }
		let reader = self.index.reader()?;
		let searcher = reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!("Lexical query '{}' parsed leniently: {} issue(s)", query, errors.len()); }
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::new();
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let source = doc.get_first(self.source_field).and_then(|v| v.as_str()).ok_or_else(|| anyhow!("stored document missing source"))?;
			let index = doc.get_first(self.chunk_index_field).and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("stored document missing chunk_index"))?;
			hits.push(SearchHit { chunk_ref: ChunkRef::new(source, index as usize), score, channel: Channel::Lexical });
		}
		Ok(hits)
	}
}

#[async_trait]
impl LexicalIndex for TantivyLexicalIndex {
	async fn index(&self, chunks: &[Chunk]) -> Result<usize> {
		self.add_chunks(chunks)
	}

	async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		self.search_chunks(query, k)
	}
}
