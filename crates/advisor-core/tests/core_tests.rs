use std::sync::{Arc, Mutex};

use advisor_core::config::Config;
use advisor_core::memory::{MemoryChunkStore, MemoryLexicalIndex, MemoryVectorStore};
use advisor_core::query::QueryInput;
use advisor_core::task_graph::TaskGraph;
use advisor_core::traits::{ChunkStore, LexicalIndex, VectorMetadata, VectorStore};
use advisor_core::types::{Chunk, ChunkRef};
use advisor_core::Error;
use serde_json::json;

#[test]
fn settings_defaults_match_reference_values() {
    let settings = Config::from_toml_str("").settings().expect("defaults");
    assert_eq!(settings.chunking.chunk_size, 800);
    assert_eq!(settings.chunking.chunk_overlap, 100);
    assert_eq!(settings.retrieval.top_k, 10);
    assert_eq!(settings.retrieval.vector_penalty, 50.0);
    assert_eq!(settings.retrieval.lexical_penalty, 50.0);
    assert_eq!(settings.rerank.top_n, 5);
    assert_eq!(settings.generation.max_tokens, 500);
}

#[test]
fn settings_override_and_validation() {
    let cfg = Config::from_toml_str("[retrieval]\ntop_k = 20\nnamespace = \"test.docs\"\n");
    let settings = cfg.settings().expect("settings");
    assert_eq!(settings.retrieval.top_k, 20);
    assert_eq!(settings.retrieval.namespace, "test.docs");
    assert_eq!(settings.retrieval.vector_penalty, 50.0, "untouched keys keep defaults");
    let top_k: usize = cfg.get("retrieval.top_k").expect("get");
    assert_eq!(top_k, 20);

    let bad = Config::from_toml_str("[chunking]\nchunk_size = 100\nchunk_overlap = 150\n");
    assert!(matches!(bad.settings(), Err(Error::InvalidConfig(_))));
    let bad = Config::from_toml_str("[retrieval]\nlexical_penalty = 0.0\n");
    assert!(matches!(bad.settings(), Err(Error::InvalidConfig(_))));
}

#[test]
fn query_input_resolves_at_the_boundary() {
    assert_eq!(QueryInput::from_json(&json!("What is CGTMSE?")).expect("str"), QueryInput::Single("What is CGTMSE?".into()));
    assert_eq!(QueryInput::from_json(&json!({"query": "List schemes"})).expect("obj"), QueryInput::Single("List schemes".into()));
    let batch = QueryInput::from_json(&json!(["a", {"query": "b"}])).expect("list");
    assert_eq!(batch.into_queries().expect("queries"), vec!["a".to_string(), "b".to_string()]);

    assert!(QueryInput::from_json(&json!({"q": "x"})).is_err());
    assert!(QueryInput::from_json(&json!(42)).is_err());
    assert!(QueryInput::Batch(vec![]).into_queries().is_err());
    assert!(QueryInput::Single("   ".into()).into_queries().is_err());
}

#[test]
fn task_graph_runs_in_topological_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut graph: TaskGraph<String> = TaskGraph::new();
    let l = log.clone();
    graph.add_task("itinerary", &["research", "budget"], move |inputs| {
        l.lock().expect("log").push("itinerary");
        Ok(format!("{} within {}", inputs.get("research")?, inputs.get("budget")?))
    }).expect("add");
    let l = log.clone();
    graph.add_task("research", &[], move |_| { l.lock().expect("log").push("research"); Ok("sights".to_string()) }).expect("add");
    let l = log.clone();
    graph.add_task("budget", &["research"], move |inputs| {
        l.lock().expect("log").push("budget");
        Ok(format!("budget for {}", inputs.get("research")?))
    }).expect("add");

    assert_eq!(graph.execution_order().expect("order"), vec!["research", "budget", "itinerary"]);
    let outputs = graph.run().expect("run");
    assert_eq!(outputs["itinerary"], "sights within budget for sights");
    assert_eq!(*log.lock().expect("log"), vec!["research", "budget", "itinerary"]);
}

#[test]
fn task_graph_enforces_declared_inputs() {
    let mut graph: TaskGraph<u32> = TaskGraph::new();
    graph.add_task("a", &[], |_| Ok(1)).expect("add");
    graph.add_task("b", &[], |_| Ok(2)).expect("add");
    graph.add_task("c", &["a"], |inputs| Ok(inputs.get("a")? + inputs.get("b")?)).expect("add");
    let err = graph.run().expect_err("undeclared read fails");
    assert!(err.to_string().contains("did not declare 'b'"), "{err}");
}

#[test]
fn task_graph_rejects_cycles_and_unknown_deps() {
    let mut graph: TaskGraph<u32> = TaskGraph::new();
    graph.add_task("a", &["b"], |_| Ok(1)).expect("add");
    graph.add_task("b", &["a"], |_| Ok(2)).expect("add");
    assert!(matches!(graph.execution_order(), Err(Error::InvalidConfig(_))));

    let mut graph: TaskGraph<u32> = TaskGraph::new();
    graph.add_task("a", &["ghost"], |_| Ok(1)).expect("add");
    assert!(graph.run().is_err());
    assert!(graph.add_task("a", &[], |_| Ok(1)).is_err(), "duplicate names rejected");
    assert!(graph.add_task("self", &["self"], |_| Ok(1)).is_err());
}

#[tokio::test]
async fn memory_chunk_store_is_first_write_wins() {
    let store = MemoryChunkStore::new();
    assert!(store.insert(&Chunk::new("a.pdf", 0, "first")).await.expect("insert"));
    assert!(!store.insert(&Chunk::new("a.pdf", 0, "second")).await.expect("insert"));
    assert!(store.contains(&ChunkRef::new("a.pdf", 0)).await.expect("contains"));
    let got = store.get_many(&[ChunkRef::new("a.pdf", 0), ChunkRef::new("missing", 3)]).await.expect("get");
    assert_eq!(got, vec![Chunk::new("a.pdf", 0, "first")]);
    assert_eq!(store.count().await.expect("count"), 1);
    store.insert(&Chunk::new("0.md", 2, "earlier source")).await.expect("insert");
    let all: Vec<ChunkRef> = store.scan().await.expect("scan").iter().map(Chunk::chunk_ref).collect();
    assert_eq!(all, vec![ChunkRef::new("0.md", 2), ChunkRef::new("a.pdf", 0)]);
}

#[tokio::test]
async fn memory_vector_store_dedups_and_ranks_by_cosine() {
    let store = MemoryVectorStore::new();
    let meta = VectorMetadata { source: "a".into(), chunk_index: 0 };
    let a = ChunkRef::new("a", 0);
    let b = ChunkRef::new("a", 1);
    assert!(store.upsert("ns", &a, &[1.0, 0.0], &meta).await.expect("upsert"));
    assert!(!store.upsert("ns", &a, &[0.0, 1.0], &meta).await.expect("upsert"), "duplicate key skipped");
    assert!(store.upsert("ns", &b, &[0.6, 0.8], &meta).await.expect("upsert"));
    assert!(store.upsert("other", &b, &[1.0, 0.0], &meta).await.expect("upsert"));
    assert!(store.contains("other", &b).await.expect("contains"));
    assert!(!store.contains("other", &a).await.expect("contains"));

    let hits = store.search("ns", &[1.0, 0.0], 5).await.expect("search");
    assert_eq!(hits.iter().map(|h| h.chunk_ref.clone()).collect::<Vec<_>>(), vec![a, b]);
    assert!((hits[0].score - 1.0).abs() < 1e-6, "kept the first vector written");
    assert_eq!(store.count("ns").await.expect("count"), 2);
}

#[tokio::test]
async fn memory_lexical_index_scores_term_matches() {
    let index = MemoryLexicalIndex::new();
    let chunks = vec![
        Chunk::new("d", 0, "PM SVANidhi gives working capital loans to street vendors"),
        Chunk::new("d", 1, "CGTMSE guarantees collateral free credit for micro enterprises"),
        Chunk::new("d", 2, "ZED certification promotes zero defect manufacturing"),
    ];
    assert_eq!(index.index(&chunks).await.expect("index"), 3);
    assert_eq!(index.index(&chunks[..1]).await.expect("index"), 0, "re-indexing skips known chunks");
    let hits = index.search("collateral free credit", 10).await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk_ref, ChunkRef::new("d", 1));
}

#[test]
fn chunk_ref_key_round_trips_with_hash_in_source() {
    let r = ChunkRef::new("report#2024.pdf", 7);
    assert_eq!(ChunkRef::parse_key(&r.key()), Some(r));
    assert_eq!(ChunkRef::parse_key("no-index"), None);
}
