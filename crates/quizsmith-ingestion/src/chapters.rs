//! Chapter segmentation by title heuristics.
//!
//! Only the first few lines of each page are inspected, and a marker counts
//! only when it starts a line. Patterns are tried in priority order:
//!
//! 1. `Chapter <n>` followed by a title fragment → `Chapter <n>: <title>`
//!    (or `Chapter <n>` when the fragment is too short)
//! 2. `Chapter <n>` alone on the line → `Chapter <n>`
//! 3. `Introduction` / `Conclusion` / `Appendix` alone on the line
//!
//! `<n>` is an arabic or roman numeral. A marker on page `i` closes the open
//! chapter at `i - 1`; the last chapter runs to the final page. A document with
//! no markers gets one fallback chapter covering every page.

use lazy_static::lazy_static;
use quizsmith_common::{ChapterMap, Page, PageRange};
use regex::Regex;
use tracing::{debug, instrument};

lazy_static! {
    static ref TITLED_CHAPTER: Regex =
        Regex::new(r"(?i)^\s*chapter\s+(\d+|[ivxlcdm]+)\b\s*[:.\-–—]?\s*(.+)$").unwrap();
    static ref BARE_CHAPTER: Regex =
        Regex::new(r"(?i)^\s*chapter\s+(\d+|[ivxlcdm]+)\s*$").unwrap();
    /// Well-formed roman numerals up to 3999.
    static ref ROMAN_NUMERAL: Regex =
        Regex::new(r"(?i)^m{0,3}(cm|cd|d?c{0,3})(xc|xl|l?x{0,3})(ix|iv|v?i{0,3})$").unwrap();
    static ref SECTION_KEYWORD: Regex =
        Regex::new(r"(?i)^\s*(introduction|conclusion|appendix)\s*$").unwrap();
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Leading lines of each page inspected for a marker.
    pub scan_lines: usize,
    /// Title fragments with at most this many characters are dropped from the label.
    pub min_title_len: usize,
    /// Label of the single chapter emitted when no marker is found.
    pub fallback_label: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            scan_lines: 5,
            min_title_len: 3,
            fallback_label: "Full Document".to_string(),
        }
    }
}

impl From<&quizsmith_config::SegmentationConfig> for SegmenterConfig {
    fn from(cfg: &quizsmith_config::SegmentationConfig) -> Self {
        Self {
            scan_lines: cfg.scan_lines,
            min_title_len: cfg.min_title_len,
            fallback_label: cfg.fallback_label.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChapterSegmenter {
    config: SegmenterConfig,
}

impl ChapterSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Map every detected chapter label to its inclusive page range.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn segment(&self, pages: &[Page]) -> ChapterMap {
        let mut chapters = ChapterMap::new();
        let mut open: Option<(String, u32)> = None;

        for page in pages {
            let Some(label) = self.detect_marker(&page.text) else {
                continue;
            };
            if let Some((current, start)) = open.take() {
                self.close(&mut chapters, current, PageRange::new(start, page.number.saturating_sub(1)));
            }
            debug!(page = page.number, label = %label, "Chapter marker");
            open = Some((label, page.number));
        }

        let last_page = pages.last().map(|p| p.number).unwrap_or(0);
        if let Some((current, start)) = open {
            self.close(&mut chapters, current, PageRange::new(start, last_page));
        }

        if chapters.is_empty() && !pages.is_empty() {
            debug!(last_page, "No chapter markers, using fallback chapter");
            chapters.insert(self.config.fallback_label.clone(), PageRange::new(1, last_page));
        }

        chapters
    }

    /// Chapter labels of `pages` in document order.
    pub fn chapters(&self, pages: &[Page]) -> Vec<String> {
        self.segment(pages).labels()
    }

    /// Label of the first marker line within the page's scan window.
    pub fn detect_marker(&self, page_text: &str) -> Option<String> {
        page_text
            .trim()
            .lines()
            .take(self.config.scan_lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .find_map(|line| self.label_for_line(line))
    }

    fn label_for_line(&self, line: &str) -> Option<String> {
        if let Some(caps) = TITLED_CHAPTER.captures(line) {
            let num = &caps[1];
            if !is_chapter_number(num) {
                return None;
            }
            let title = caps[2].trim_matches(|c: char| c.is_whitespace() || ":.-–—".contains(c));
            return Some(if title.chars().count() > self.config.min_title_len {
                format!("Chapter {num}: {title}")
            } else {
                format!("Chapter {num}")
            });
        }
        if let Some(caps) = BARE_CHAPTER.captures(line) {
            return is_chapter_number(&caps[1]).then(|| format!("Chapter {}", &caps[1]));
        }
        SECTION_KEYWORD
            .captures(line)
            .map(|caps| capitalize(&caps[1].to_lowercase()))
    }

    fn close(&self, chapters: &mut ChapterMap, label: String, range: PageRange) {
        if !chapters.insert(label.clone(), range) {
            debug!(label = %label, range = %range, "Duplicate chapter label, keeping first range");
        }
    }
}

/// Arabic digits, or letters that spell a valid roman numeral ("Civil" does not).
fn is_chapter_number(num: &str) -> bool {
    num.chars().all(|c| c.is_ascii_digit()) || ROMAN_NUMERAL.is_match(num)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
