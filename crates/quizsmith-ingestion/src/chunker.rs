//! Recursive character chunker.
//!
//! Text is split on the coarsest separator that occurs in it (paragraph, line,
//! sentence, word, then single characters). Pieces that are still too long are
//! split again with the finer separators, and adjacent small pieces are merged
//! back up to `max_chars`, carrying up to `overlap_chars` of trailing text into
//! the next chunk. Lengths are counted in characters.
//!
//! Chunks are cut page by page, so every chunk belongs to exactly one page and
//! inherits that page's chapter label.

use quizsmith_common::{ChapterMap, Chunk, Page};
use tracing::{debug, instrument, warn};

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 1000, overlap_chars: 150 }
    }
}

impl From<&quizsmith_config::ChunkingConfig> for ChunkerConfig {
    fn from(cfg: &quizsmith_config::ChunkingConfig) -> Self {
        Self { max_chars: cfg.max_chars, overlap_chars: cfg.overlap_chars }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk every page and tag each chunk with the chapter containing its page.
    #[instrument(skip_all, fields(pages = pages.len(), chapters = chapters.len()))]
    pub fn chunk_pages(&self, pages: &[Page], chapters: &ChapterMap) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            let chapter = chapters.chapter_for_page(page.number).map(str::to_string);
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    index: chunks.len(),
                    page: page.number,
                    chapter: chapter.clone(),
                    text,
                });
            }
        }
        debug!(chunks = chunks.len(), "Pages chunked");
        chunks
    }

    /// Split `text` into trimmed, non-empty pieces of at most `max_chars` characters.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.max_chars {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily pack `pieces` into chunks, keeping a tail of at most
    /// `overlap_chars` from each emitted chunk as the head of the next.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let max = self.config.max_chars;
        let overlap = self.config.overlap_chars;

        let mut out = Vec::new();
        let mut window: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > max {
                if total > max {
                    warn!(len = total, max, "Created a chunk longer than the limit");
                }
                if !window.is_empty() {
                    push_trimmed(&mut out, &window.iter().copied().collect::<String>());
                    while total > overlap || (total + len > max && total > 0) {
                        match window.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }
        if !window.is_empty() {
            push_trimmed(&mut out, &window.iter().copied().collect::<String>());
        }
        out
    }
}

/// The first separator present in `text`, plus the finer ones after it.
/// The empty separator always matches and has nothing finer.
fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split before each occurrence of `separator`, so the separator stays at the
/// start of the piece that follows it. An empty separator yields single characters.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quizsmith_common::PageRange;

    fn chunker(max_chars: usize, overlap_chars: usize) -> Chunker {
        Chunker::new(ChunkerConfig { max_chars, overlap_chars })
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i:04}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = Chunker::default().split_text("  Mitochondria make ATP.  ");
        assert_eq!(chunks, vec!["Mitochondria make ATP.".to_string()]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(Chunker::default().split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_chunks_never_exceed_max_chars() {
        let text = format!("{}\n\n{}\n{}", numbered_words(300), numbered_words(40), numbered_words(500));
        for chunk in chunker(200, 50).split_text(&text) {
            assert!(chunk.chars().count() <= 200, "chunk too long: {}", chunk.len());
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunks = chunker(200, 50).split_text(&numbered_words(200));
        assert!(chunks.len() > 3);
        for pair in chunks.windows(2) {
            let head = pair[1].split_whitespace().next().unwrap();
            assert!(pair[0].contains(head), "{head} not carried over from previous chunk");
            assert_ne!(pair[0].split_whitespace().next(), Some(head));
        }
    }

    #[test]
    fn test_paragraph_boundaries_are_preferred() {
        let para_a = "a".repeat(60);
        let para_b = "b".repeat(60);
        let chunks = chunker(100, 10).split_text(&format!("{para_a}\n\n{para_b}"));
        assert_eq!(chunks, vec![para_a, para_b]);
    }

    #[test]
    fn test_unbroken_text_is_hard_cut() {
        let chunks = chunker(1000, 150).split_text(&"x".repeat(2500));
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 800]);
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let chunks = chunker(10, 2).split_text(&"é".repeat(25));
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.len() >= 3);
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = numbered_words(400);
        let c = chunker(300, 60);
        assert_eq!(c.split_text(&text), c.split_text(&text));
    }

    #[test]
    fn test_chunks_carry_page_and_chapter() {
        let pages = vec![
            Page::new(1, "Preface text"),
            Page::new(2, "Chapter 1: Cells\nCells are small."),
            Page::new(3, ""),
            Page::new(4, "Chapter 2: Genetics\nDNA stores information."),
        ];
        let mut chapters = ChapterMap::new();
        chapters.insert("Chapter 1: Cells", PageRange::new(2, 3));
        chapters.insert("Chapter 2: Genetics", PageRange::new(4, 4));

        let chunks = Chunker::default().chunk_pages(&pages, &chapters);
        let tagged: Vec<(usize, u32, Option<&str>)> = chunks
            .iter()
            .map(|c| (c.index, c.page, c.chapter.as_deref()))
            .collect();
        assert_eq!(
            tagged,
            vec![
                (0, 1, None),
                (1, 2, Some("Chapter 1: Cells")),
                (2, 4, Some("Chapter 2: Genetics")),
            ]
        );
    }

    #[test]
    fn test_split_keeping_separator_attaches_to_following_piece() {
        assert_eq!(split_keeping_separator("a. b. c", ". "), vec!["a", ". b", ". c"]);
        assert_eq!(split_keeping_separator("\n\nx", "\n\n"), vec!["\n\nx"]);
    }
}
