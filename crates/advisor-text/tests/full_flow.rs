use advisor_core::traits::LexicalIndex;
use advisor_core::types::{Chunk, ChunkRef};
use advisor_text::TantivyLexicalIndex;
use tempfile::TempDir;

fn corpus() -> Vec<Chunk> {
    vec![
        Chunk::new("schemes.pdf", 0, "PM SVANidhi provides working capital loans to street vendors."),
        Chunk::new("schemes.pdf", 1, "CGTMSE extends collateral free credit guarantees to micro and small enterprises."),
        Chunk::new("schemes.pdf", 2, "The ZED certification scheme subsidises zero defect zero effect manufacturing."),
        Chunk::new("startup.md", 0, "Credit guarantee for startups is handled by a separate fund."),
    ]
}

#[tokio::test]
async fn tantivy_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let index_dir = tmp.path().join("tantivy");

    let index = TantivyLexicalIndex::open_or_create(&index_dir).expect("index");
    assert_eq!(index.index(&corpus()).await.expect("index chunks"), 4);

    let hits = index.search("collateral free guarantee", 10).await.expect("search");
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk_ref, ChunkRef::new("schemes.pdf", 1));
    for pair in hits.windows(2) { assert!(pair[0].score >= pair[1].score); }

    // Reopen from disk: documents persist and re-adding them is a no-op.
    drop(index);
    let reopened = TantivyLexicalIndex::open(&index_dir).expect("reopen");
    assert_eq!(reopened.index(&corpus()).await.expect("reindex"), 0);
    assert_eq!(reopened.num_docs().expect("docs"), 4);
}

#[tokio::test]
async fn lenient_parsing_and_stopword_only_queries() {
    let index = TantivyLexicalIndex::in_memory().expect("index");
    index.index(&corpus()).await.expect("index chunks");

    let hits = index.search("What's ZED? (certification: scheme", 5).await.expect("lenient");
    assert_eq!(hits.first().map(|h| h.chunk_ref.clone()), Some(ChunkRef::new("schemes.pdf", 2)));
    assert!(index.search("what is the", 5).await.expect("stopwords").is_empty());
    assert!(index.search("credit", 0).await.expect("k=0").is_empty());
}

#[test]
fn open_fails_when_index_not_built() {
    let tmp = TempDir::new().expect("tmp");
    assert!(TantivyLexicalIndex::open(&tmp.path().join("missing")).is_err());
}
