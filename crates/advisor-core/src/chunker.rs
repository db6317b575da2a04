//! Overlapping, boundary-aware text splitter.
//!
//! Each chunk holds at most `chunk_size` characters. When a document does not
//! fit, the split point is searched inside the window tier by tier (headings,
//! paragraphs, lines, sentences, whitespace) and falls back to a hard cutoff.
//! The next chunk starts `chunk_overlap` characters before the previous one
//! ended, snapped forward to a word start when one exists in that span.

use crate::config::ChunkingSettings;
use crate::error::Result;

/// A separator and how many of its leading characters stay with the left chunk.
struct Boundary {
    pattern: &'static str,
    keep: usize,
}

const fn b(pattern: &'static str, keep: usize) -> Boundary {
    Boundary { pattern, keep }
}

/// Highest priority first.
const TIERS: &[&[Boundary]] = &[
    &[b("\n\n## ", 0), b("\n\n# ", 0), b("\n\n**", 0)],
    &[b("\n\n", 0)],
    &[b("\n", 0)],
    &[b(". ", 1), b("? ", 1), b("! ", 1)],
    &[b(" ", 0), b("\t", 0)],
];

#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(settings: &ChunkingSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { size: settings.chunk_size, overlap: settings.chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize { self.size }
    pub fn chunk_overlap(&self) -> usize { self.overlap }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut end = chars.len();
        while end > 0 && chars[end - 1].is_whitespace() { end -= 1; }
        let mut start = skip_whitespace(&chars, 0, end);

        let mut chunks = Vec::new();
        while start < end {
            if end - start <= self.size {
                chunks.push(chars[start..end].iter().collect());
                break;
            }
            let cut = self.find_cut(&chars, start, end);
            chunks.push(chars[start..cut].iter().collect());
            start = skip_whitespace(&chars, self.next_start(&chars, cut), end);
        }
        chunks
    }

    /// Returns the exclusive end of the chunk starting at `start`. The result
    /// is always `<= start + size` and leaves room for the overlap to advance.
    fn find_cut(&self, chars: &[char], start: usize, end: usize) -> usize {
        let limit = (start + self.size).min(end);
        let min_end = start + self.overlap + 1;
        for tier in TIERS {
            let best = tier
                .iter()
                .filter_map(|boundary| last_boundary(chars, start, limit, min_end, boundary))
                .max();
            if let Some(cut) = best {
                return cut;
            }
        }
        let trimmed = trim_end(chars, start, limit);
        if trimmed >= min_end { trimmed } else { limit }
    }

    fn next_start(&self, chars: &[char], cut: usize) -> usize {
        let raw = cut.saturating_sub(self.overlap);
        (raw..cut)
            .find(|&p| !chars[p].is_whitespace() && (p == 0 || chars[p - 1].is_whitespace()))
            .unwrap_or(raw)
    }
}

/// Latest occurrence of `boundary` whose trimmed cut lies in `[min_end, limit]`.
fn last_boundary(chars: &[char], start: usize, limit: usize, min_end: usize, boundary: &Boundary) -> Option<usize> {
    let pattern: Vec<char> = boundary.pattern.chars().collect();
    let mut p = limit.checked_sub(boundary.keep)?;
    while p > start {
        if p + pattern.len() <= chars.len() && chars[p..p + pattern.len()] == pattern[..] {
            let cut = trim_end(chars, start, p + boundary.keep);
            if cut < min_end {
                return None;
            }
            return Some(cut);
        }
        p -= 1;
    }
    None
}

fn trim_end(chars: &[char], start: usize, mut end: usize) -> usize {
    while end > start && chars[end - 1].is_whitespace() { end -= 1; }
    end
}

fn skip_whitespace(chars: &[char], mut pos: usize, end: usize) -> usize {
    while pos < end && chars[pos].is_whitespace() { pos += 1; }
    pos
}
