use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use advisor_core::config::{expand_path, Settings};
use advisor_core::document::FormatExtractor;
use advisor_core::memory::{MemoryChunkStore, MemoryLexicalIndex, MemoryVectorStore};
use advisor_core::traits::{ChunkStore, CrossEncoder, Embedder, Generator, LexicalIndex, TextExtractor, VectorStore};
use advisor_embed::{get_default_cross_encoder, get_default_embedder};
use advisor_llm::OllamaGenerator;
use advisor_text::TantivyLexicalIndex;
use advisor_vector::{LanceChunkStore, LanceVectorStore};

/// Every collaborator the pipeline talks to, built once per process and
/// handed to the [`crate::Advisor`].
pub struct AdvisorContext {
    pub settings: Settings,
    pub extractor: Arc<dyn TextExtractor>,
    pub chunk_store: Arc<dyn ChunkStore>,
    pub vector_store: Arc<dyn VectorStore>,
    /// `None` when the lexical index could not be opened; queries then run
    /// on the vector channel alone.
    pub lexical_index: Option<Arc<dyn LexicalIndex>>,
    pub embedder: Arc<dyn Embedder>,
    pub cross_encoder: Arc<dyn CrossEncoder>,
    pub generator: Arc<dyn Generator>,
}

impl AdvisorContext {
    /// Production wiring: LanceDB stores, Tantivy index, Candle models and
    /// the Ollama client. Relative data paths resolve against `base`.
    pub async fn open(settings: Settings, base: &Path) -> Result<Self> {
        settings.validate()?;
        let store_dir = settings.data.store_dir(base);
        std::fs::create_dir_all(&store_dir)?;
        let store_uri = store_dir.to_string_lossy().to_string();

        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(settings.embedding.model_dir.as_deref().map(expand_path).as_deref())?);
        let cross_encoder: Arc<dyn CrossEncoder> = Arc::from(get_default_cross_encoder(settings.rerank.model_dir.as_deref().map(expand_path).as_deref())?);
        let chunk_store = Arc::new(LanceChunkStore::open(&store_uri).await?);
        let vector_store = Arc::new(LanceVectorStore::open(&store_uri, embedder.dim()).await?);

        let lexical_dir = settings.data.lexical_index_dir(base);
        let lexical_index: Option<Arc<dyn LexicalIndex>> = match TantivyLexicalIndex::open_or_create(&lexical_dir) {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                warn!("Lexical index at {} unavailable: {}", lexical_dir.display(), e);
                None
            }
        };
        let generator = Arc::new(OllamaGenerator::new(&settings.generation)?);
        info!("Advisor context ready (store: {}, lexical: {})", store_uri, lexical_dir.display());

        Ok(Self {
            settings,
            extractor: Arc::new(FormatExtractor),
            chunk_store,
            vector_store,
            lexical_index,
            embedder,
            cross_encoder,
            generator,
        })
    }

    /// In-process stores around the given models; nothing touches disk.
    pub fn in_memory(settings: Settings, embedder: Arc<dyn Embedder>, cross_encoder: Arc<dyn CrossEncoder>, generator: Arc<dyn Generator>) -> Self {
        Self {
            settings,
            extractor: Arc::new(FormatExtractor),
            chunk_store: Arc::new(MemoryChunkStore::new()),
            vector_store: Arc::new(MemoryVectorStore::new()),
            lexical_index: Some(Arc::new(MemoryLexicalIndex::new())),
            embedder,
            cross_encoder,
            generator,
        }
    }
}
