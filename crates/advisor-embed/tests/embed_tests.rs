use advisor_core::traits::{CrossEncoder, Embedder};
use advisor_embed::{get_default_cross_encoder, get_default_embedder, HashEmbedder, TermOverlapScorer, DEFAULT_DIM};

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(None).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), DEFAULT_DIM);
    assert_eq!(embedder.dim(), DEFAULT_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }

    let reranker = get_default_cross_encoder(None).expect("cross encoder");
    assert!(reranker.score("credit guarantee", "credit guarantee fund").expect("score") > 0.9);
}

#[test]
fn hash_embedder_places_shared_terms_closer() {
    let e = HashEmbedder::new(256);
    let q = e.embed("collateral free loans").expect("q");
    let near = e.embed("Collateral-free loans for micro units.").expect("near");
    let far = e.embed("Zero defect certification audit").expect("far");
    let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    assert!(dot(&q, &near) > dot(&q, &far));
    assert!(e.embed_batch(&[]).expect("empty").is_empty());
}

#[test]
fn term_overlap_scores_fraction_of_query_terms() {
    let s = TermOverlapScorer;
    assert_eq!(s.score("ZED certification", "The ZED certification scheme").expect("s"), 1.0);
    assert_eq!(s.score("ZED certification", "working capital").expect("s"), 0.0);
    assert_eq!(s.score("?", "anything").expect("s"), 0.0);
    let batch = s.score_batch("credit guarantee", &["credit only", "neither"]).expect("batch");
    assert_eq!(batch, vec![0.5, 0.0]);
}
