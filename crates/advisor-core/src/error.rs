use thiserror::Error;

use crate::types::{Channel, ChunkRef};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// A source document could not be parsed as its declared format.
    #[error("Extraction failed for '{source_id}': {reason}")]
    Extraction { source_id: String, reason: String },

    /// The embedding provider failed for a single chunk.
    #[error("Embedding failed for {chunk}: {reason}")]
    Embedding { chunk: ChunkRef, reason: String },

    #[error("{channel} channel unavailable: {reason}")]
    ChannelUnavailable { channel: Channel, reason: String },

    /// Every retrieval channel failed; the backend is down, not empty.
    #[error("Retrieval unavailable: vector: {vector}; lexical: {lexical}")]
    RetrievalUnavailable { vector: String, lexical: String },

    #[error("No matching content for query '{0}'")]
    NoMatchingContent(String),

    #[error("Reranking failed: {0}")]
    Rerank(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// True when the failure means a backend could not be reached, as opposed
    /// to the corpus simply having nothing relevant.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Error::RetrievalUnavailable { .. }
                | Error::ChannelUnavailable { .. }
                | Error::Store(_)
                | Error::Rerank(_)
                | Error::Synthesis(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
