//! Data model shared by the segmentation, retrieval and generation stages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;

// ── Pages and chapters ────────────────────────────────────────────────────────

/// One page of extracted text. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self { number, text: text.into() }
    }
}

/// Inclusive, 1-based page span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, page: u32) -> bool {
        self.start <= page && page <= self.end
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start { 0 } else { self.end - self.start + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub label: String,
    pub pages: PageRange,
}

/// Chapter label → page range, in first-seen document order.
///
/// Labels are unique: inserting a label that is already present keeps the
/// existing range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMap {
    entries: Vec<ChapterRange>,
}

impl ChapterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the label was already present.
    pub fn insert(&mut self, label: impl Into<String>, pages: PageRange) -> bool {
        let label = label.into();
        if self.get(&label).is_some() {
            return false;
        }
        self.entries.push(ChapterRange { label, pages });
        true
    }

    pub fn get(&self, label: &str) -> Option<&ChapterRange> {
        self.entries.iter().find(|c| c.label == label)
    }

    /// Resolve a caller-supplied chapter name.
    ///
    /// Comparison ignores case and surrounding/repeated whitespace. A full
    /// label match wins; otherwise a request naming only the numbered head of a
    /// titled label ("chapter 1" for "Chapter 1: Forces") resolves to the first
    /// such label.
    pub fn find(&self, requested: &str) -> Option<&ChapterRange> {
        let wanted = normalize_label(requested);
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|c| normalize_label(&c.label) == wanted)
            .or_else(|| {
                self.entries.iter().find(|c| {
                    c.label
                        .split_once(':')
                        .map(|(head, _)| normalize_label(head) == wanted)
                        .unwrap_or(false)
                })
            })
    }

    /// First chapter whose range contains `page`.
    pub fn chapter_for_page(&self, page: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.pages.contains(page))
            .map(|c| c.label.as_str())
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.label.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChapterRange> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_label(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ── Chunks ────────────────────────────────────────────────────────────────────

/// A retrieval unit cut from a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub page: u32,
    /// `None` when no chapter range contains `page`; such chunks never match a chapter filter.
    pub chapter: Option<String>,
    pub text: String,
}

// ── Quiz request / response ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy   => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard   => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy"   => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard"   => Ok(Difficulty::Hard),
            other    => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Caller-supplied quiz parameters. Accepts the camelCase names used by the web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    #[serde(alias = "fileId")]
    pub document_id: String,
    pub chapter: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(alias = "numberOfQuestions")]
    pub question_count: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl QuizRequest {
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.document_id.trim().is_empty() {
            return Err(QuizError::InvalidRequest("document id must not be empty".to_string()));
        }
        if self.chapter.trim().is_empty() {
            return Err(QuizError::InvalidRequest("chapter must not be empty".to_string()));
        }
        if self.question_count == 0 {
            return Err(QuizError::InvalidRequest("question count must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResponse {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bio_chapters() -> ChapterMap {
        let mut map = ChapterMap::new();
        map.insert("Chapter 1: Cells", PageRange::new(1, 5));
        map.insert("Chapter 2: Genetics", PageRange::new(6, 10));
        map.insert("Appendix", PageRange::new(11, 12));
        map
    }

    #[test]
    fn test_find_is_case_and_whitespace_insensitive() {
        let map = bio_chapters();
        let hit = map.find("  chapter 2:   GENETICS ").unwrap();
        assert_eq!(hit.pages, PageRange::new(6, 10));
        assert_eq!(map.find("appendix").unwrap().label, "Appendix");
    }

    #[test]
    fn test_find_resolves_numbered_head_of_titled_label() {
        let mut map = ChapterMap::new();
        map.insert("Chapter 1: Forces", PageRange::new(1, 9));
        assert_eq!(map.find(" chapter 1 ").unwrap().label, "Chapter 1: Forces");
        assert!(map.find("chapter 11").is_none());
    }

    #[test]
    fn test_find_prefers_full_label_over_head() {
        let mut map = ChapterMap::new();
        map.insert("Chapter 1: Forces", PageRange::new(1, 4));
        map.insert("Chapter 1", PageRange::new(5, 9));
        assert_eq!(map.find("chapter 1").unwrap().pages, PageRange::new(5, 9));
    }

    #[test]
    fn test_find_unknown_or_blank_is_none() {
        let map = bio_chapters();
        assert!(map.find("Chapter 3").is_none());
        assert!(map.find("   ").is_none());
    }

    #[test]
    fn test_insert_keeps_first_range_for_duplicate_label() {
        let mut map = ChapterMap::new();
        assert!(map.insert("Introduction", PageRange::new(1, 2)));
        assert!(!map.insert("Introduction", PageRange::new(7, 8)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Introduction").unwrap().pages, PageRange::new(1, 2));
    }

    #[test]
    fn test_chapter_for_page() {
        let map = bio_chapters();
        assert_eq!(map.chapter_for_page(5), Some("Chapter 1: Cells"));
        assert_eq!(map.chapter_for_page(6), Some("Chapter 2: Genetics"));
        assert_eq!(map.chapter_for_page(13), None);
    }

    #[test]
    fn test_request_accepts_camel_case_and_defaults_difficulty() {
        let req: QuizRequest = serde_json::from_str(
            r#"{"fileId":"bio101.pdf","chapter":"Chapter 1","numberOfQuestions":5,"title":"Cells quiz"}"#,
        )
        .unwrap();
        assert_eq!(req.document_id, "bio101.pdf");
        assert_eq!(req.question_count, 5);
        assert_eq!(req.difficulty, Difficulty::Medium);
        assert_eq!(req.description, None);
    }

    #[test]
    fn test_request_rejects_unknown_difficulty() {
        let parsed: Result<QuizRequest, _> = serde_json::from_str(
            r#"{"document_id":"a.pdf","chapter":"Intro","difficulty":"brutal","question_count":1,"title":"t"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_zero_questions_is_invalid() {
        let req = QuizRequest {
            document_id: "a.pdf".to_string(),
            chapter: "Introduction".to_string(),
            difficulty: Difficulty::Easy,
            question_count: 0,
            title: "t".to_string(),
            description: None,
        };
        assert!(matches!(req.validate(), Err(QuizError::InvalidRequest(_))));
    }

    #[test]
    fn test_page_range_len() {
        assert_eq!(PageRange::new(6, 10).len(), 5);
        assert!(PageRange::new(4, 3).is_empty());
    }
}
