//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a chunk: the document it came from and its position in it.
///
/// Ordered by `(source, index)` so chunk sets sort deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkRef {
    pub source: String,
    pub index: usize,
}

impl ChunkRef {
    pub fn new(source: impl Into<String>, index: usize) -> Self {
        Self { source: source.into(), index }
    }

    /// Storage key, `"<source>#<index>"`.
    pub fn key(&self) -> String {
        format!("{}#{}", self.source, self.index)
    }

    /// Inverse of [`ChunkRef::key`]. Splits on the last `#` so sources may
    /// contain the character themselves.
    pub fn parse_key(key: &str) -> Option<Self> {
        let (source, index) = key.rsplit_once('#')?;
        Some(Self { source: source.to_string(), index: index.parse().ok()? })
    }
}

impl fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.index)
    }
}

/// A bounded span of source-document text. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self { source: source.into(), index, text: text.into() }
    }

    pub fn chunk_ref(&self) -> ChunkRef {
        ChunkRef::new(self.source.clone(), self.index)
    }
}

/// One embedding per chunk, stored under a namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVector {
    pub chunk_ref: ChunkRef,
    pub embedding: Vec<f32>,
    pub namespace: String,
}

/// Indicates which retrieval channel produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Channel {
    Vector,
    Lexical,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vector => f.write_str("vector"),
            Channel::Lexical => f.write_str("lexical"),
        }
    }
}

/// The minimal surface returned by every search channel.
///
/// `score` is channel-specific but higher is always better. Hits are
/// returned best-first; the position in the list is the channel rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_ref: ChunkRef,
    pub score: f32,
    pub channel: Channel,
}

/// A fused hybrid-search result, produced per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk_ref: ChunkRef,
    pub text: String,
    pub lexical_score: Option<f32>,
    pub vector_score: Option<f32>,
    pub fused_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedChunk {
    pub candidate: RetrievalCandidate,
    pub relevance_score: f32,
}

/// Reranked candidates, best first, at most `top_n` long.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankedContext {
    pub items: Vec<RankedChunk>,
}

impl RankedContext {
    pub fn new(items: Vec<RankedChunk>) -> Self { Self { items } }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn chunk_refs(&self) -> Vec<ChunkRef> {
        self.items.iter().map(|i| i.candidate.chunk_ref.clone()).collect()
    }

    /// Chunk texts joined by blank lines, order preserved.
    pub fn context_block(&self) -> String {
        self.items
            .iter()
            .map(|i| i.candidate.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub used_context: RankedContext,
}

/// Declared format of a raw source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Markdown,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// A raw document handed to the ingestor.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source_id: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(source_id: impl Into<String>, format: DocumentFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self { source_id: source_id.into(), format, bytes: bytes.into() }
    }

    pub fn text(source_id: impl Into<String>, text: &str) -> Self {
        Self::new(source_id, DocumentFormat::PlainText, text.as_bytes().to_vec())
    }
}
