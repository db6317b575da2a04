use advisor_core::chunker::Chunker;
use advisor_core::config::ChunkingSettings;

fn chunker(size: usize, overlap: usize) -> Chunker {
    Chunker::new(&ChunkingSettings { chunk_size: size, chunk_overlap: overlap }).expect("chunker")
}

fn scheme_document() -> String {
    let mut doc = String::new();
    for i in 0..12 {
        doc.push_str(&format!("\n\n## Scheme {i}\n\n"));
        for j in 0..6 {
            doc.push_str(&format!(
                "Scheme {i} offers collateral free credit to micro enterprises under clause {j}. \
                 Applicants must hold a valid Udyam registration and a turnover below the ceiling. "
            ));
        }
    }
    doc
}

/// Characters shared by the end of `a` and the start of `b`.
fn shared_overlap(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    (1..=a.len().min(b.len())).rev().find(|&n| a[a.len() - n..] == b[..n]).unwrap_or(0)
}

#[test]
fn short_text_is_one_trimmed_chunk() {
    let chunks = chunker(800, 100).split("  \n Short text about PMEGP. \n\n ");
    assert_eq!(chunks, vec!["Short text about PMEGP.".to_string()]);
}

#[test]
fn blank_text_yields_no_chunks() {
    assert!(chunker(800, 100).split(" \n\t\n ").is_empty());
    assert!(chunker(800, 100).split("").is_empty());
}

#[test]
fn chunks_respect_size_and_share_overlap() {
    let doc = scheme_document();
    let chunks = chunker(800, 100).split(&doc);
    assert!(chunks.len() > 3, "document spans several chunks");
    for c in &chunks {
        assert!(c.chars().count() <= 800, "chunk of {} chars", c.chars().count());
        assert_eq!(c.trim(), c, "chunks are trimmed");
    }
    for pair in chunks.windows(2) {
        assert!(shared_overlap(&pair[0], &pair[1]) >= 1, "consecutive chunks overlap:\n{}\n---\n{}", pair[0], pair[1]);
    }
}

#[test]
fn prefers_heading_boundaries() {
    let section = "word ".repeat(90);
    let doc = format!("# Intro\n\n{section}\n\n## CGTMSE\n\n{section}");
    let chunks = chunker(800, 100).split(&doc);
    assert!(chunks.len() >= 2);
    assert!(!chunks[0].contains("## CGTMSE"), "first chunk ends before the heading");
    assert!(chunks.iter().skip(1).any(|c| c.contains("## CGTMSE")));
}

#[test]
fn falls_back_to_sentence_then_whitespace() {
    let sentences = "The subsidy covers eighty percent of certification cost. ".repeat(30);
    let chunks = chunker(200, 20).split(&sentences);
    for c in &chunks[..chunks.len() - 1] {
        assert!(c.ends_with('.'), "chunk should end at a sentence: {c:?}");
    }

    let words = "alpha beta gamma delta ".repeat(40);
    let chunks = chunker(100, 10).split(&words);
    for c in &chunks {
        assert!(c.chars().count() <= 100);
        assert!(!c.starts_with(' ') && !c.ends_with(' '));
    }
}

#[test]
fn hard_cutoff_for_unbroken_text() {
    let text = "x".repeat(2000);
    let chunks = chunker(800, 100).split(&text);
    assert!(chunks.iter().all(|c| c.chars().count() <= 800));
    for pair in chunks.windows(2) {
        assert!(shared_overlap(&pair[0], &pair[1]) >= 1);
    }
    let total_unique = chunks.iter().map(|c| c.len()).sum::<usize>() - 100 * (chunks.len() - 1);
    assert_eq!(total_unique, 2000, "overlap is exactly the configured span on hard cuts");
}

#[test]
fn splitting_is_deterministic() {
    let doc = scheme_document();
    let c = chunker(800, 100);
    assert_eq!(c.split(&doc), c.split(&doc));
}

#[test]
fn rejects_overlap_not_smaller_than_size() {
    assert!(Chunker::new(&ChunkingSettings { chunk_size: 100, chunk_overlap: 100 }).is_err());
    assert!(Chunker::new(&ChunkingSettings { chunk_size: 0, chunk_overlap: 0 }).is_err());
}
