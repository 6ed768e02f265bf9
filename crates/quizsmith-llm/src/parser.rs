//! Extraction and validation of the quiz JSON in model output.
//!
//! Model text may wrap the payload in a ```json fenced block; when one is
//! present only its interior is parsed, otherwise the whole text is. JSON
//! syntax failures and quiz-shape failures are reported as distinct
//! [`MalformedKind`]s, both carrying the complete raw output.

use lazy_static::lazy_static;
use quizsmith_common::{MalformedKind, QuizError, QuizQuestion};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"(?i)```json\s*([\s\S]+?)\s*```").unwrap();
}

const OPTION_COUNT: usize = 4;
/// Characters of raw output echoed into a log line.
const LOG_EXCERPT_CHARS: usize = 500;

pub struct ResponseParser;

impl ResponseParser {
    /// Validated questions from `raw`. A payload without a "questions" key has none.
    pub fn parse(raw: &str) -> Result<Vec<QuizQuestion>, QuizError> {
        let payload = extract_payload(raw);

        let value: Value = serde_json::from_str(payload).map_err(|e| {
            warn!(error = %e, raw = %excerpt(raw), "Model output is not valid JSON");
            malformed(MalformedKind::Syntax, e.to_string(), raw)
        })?;

        let questions = validate(&value).map_err(|detail| {
            warn!(detail = %detail, raw = %excerpt(raw), "Model output has wrong quiz structure");
            malformed(MalformedKind::Structure, detail, raw)
        })?;
        debug!(questions = questions.len(), "Parsed model output");
        Ok(questions)
    }
}

/// Interior of the first ```json fence, or the trimmed text when there is none.
pub fn extract_payload(raw: &str) -> &str {
    JSON_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| raw.trim())
}

fn excerpt(raw: &str) -> &str {
    match raw.char_indices().nth(LOG_EXCERPT_CHARS) {
        Some((cut, _)) => &raw[..cut],
        None => raw,
    }
}

fn malformed(kind: MalformedKind, detail: String, raw: &str) -> QuizError {
    QuizError::MalformedResponse { kind, detail, raw: raw.to_string() }
}

fn validate(value: &Value) -> Result<Vec<QuizQuestion>, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", type_name(value)))?;
    let questions = match object.get("questions") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(format!("\"questions\" must be an array, got {}", type_name(other))),
    };
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| validate_question(q).map_err(|e| format!("question {}: {}", i + 1, e)))
        .collect()
}

fn validate_question(value: &Value) -> Result<QuizQuestion, String> {
    let q = value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", type_name(value)))?;

    let question_text = match q.get("question_text") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err("question_text is empty".to_string()),
        Some(other) => return Err(format!("question_text must be a string, got {}", type_name(other))),
        None => return Err("missing question_text".to_string()),
    };

    let options: Vec<String> = match q.get("options") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|o| o.as_str().map(str::to_string).ok_or_else(|| "options must be strings".to_string()))
            .collect::<Result<_, _>>()?,
        Some(other) => return Err(format!("options must be an array, got {}", type_name(other))),
        None => return Err("missing options".to_string()),
    };
    if options.len() != OPTION_COUNT {
        return Err(format!("expected exactly {} options, got {}", OPTION_COUNT, options.len()));
    }
    for (i, option) in options.iter().enumerate() {
        if options[..i].contains(option) {
            return Err(format!("duplicate option \"{option}\""));
        }
    }

    let correct_answer = match q.get("correct_answer") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(format!("correct_answer must be a string, got {}", type_name(other))),
        None => return Err("missing correct_answer".to_string()),
    };
    if !options.contains(&correct_answer) {
        return Err(format!("correct_answer \"{correct_answer}\" is not one of the options"));
    }

    Ok(QuizQuestion { question_text, options, correct_answer })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BARE: &str = r#"{"questions":[{"question_text":"Q","options":["A","B","C","D"],"correct_answer":"A"}]}"#;

    fn structure_detail(raw: &str) -> String {
        match ResponseParser::parse(raw) {
            Err(QuizError::MalformedResponse { kind: MalformedKind::Structure, detail, .. }) => detail,
            other => panic!("expected structure error, got {other:?}"),
        }
    }

    #[test]
    fn test_fenced_block_is_parsed() {
        let raw = "```json\n{\"questions\":[{\"question_text\":\"Q\",\"options\":[\"A\",\"B\",\"C\",\"D\"],\"correct_answer\":\"A\"}]}\n```";
        let questions = ResponseParser::parse(raw).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[0].correct_answer, "A");
    }

    #[test]
    fn test_fenced_and_bare_produce_identical_output() {
        let fenced = format!("Here is your quiz:\n```JSON\n{BARE}\n```\nGood luck!");
        assert_eq!(ResponseParser::parse(&fenced).unwrap(), ResponseParser::parse(BARE).unwrap());
    }

    #[test]
    fn test_bare_json_with_surrounding_whitespace() {
        let questions = ResponseParser::parse(&format!("\n\n  {BARE}  \n")).unwrap();
        assert_eq!(questions[0].question_text, "Q");
    }

    #[test]
    fn test_invalid_json_is_syntax_error_with_raw_text() {
        let raw = "Sure! Here are five questions about cells...";
        match ResponseParser::parse(raw) {
            Err(QuizError::MalformedResponse { kind, raw: kept, .. }) => {
                assert_eq!(kind, MalformedKind::Syntax);
                assert_eq!(kept, raw);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_json_inside_fence_is_syntax_error() {
        let raw = "```json\n{\"questions\": [\n```";
        let err = ResponseParser::parse(raw).unwrap_err();
        assert!(matches!(err, QuizError::MalformedResponse { kind: MalformedKind::Syntax, ref raw, .. } if raw.contains("```json")));
    }

    #[test]
    fn test_missing_questions_key_is_empty_quiz() {
        assert!(ResponseParser::parse(r#"{"quiz": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_non_object_top_level_is_structure_error() {
        assert!(structure_detail("[1, 2, 3]").contains("expected a JSON object"));
        assert!(structure_detail(r#"{"questions": "none"}"#).contains("must be an array"));
    }

    #[test]
    fn test_wrong_option_count_is_structure_error() {
        let raw = r#"{"questions":[{"question_text":"Q","options":["A","B","C"],"correct_answer":"A"}]}"#;
        assert_eq!(structure_detail(raw), "question 1: expected exactly 4 options, got 3");
    }

    #[test]
    fn test_answer_must_match_an_option_exactly() {
        let raw = r#"{"questions":[{"question_text":"Q","options":["A","B","C","D"],"correct_answer":"a"}]}"#;
        assert!(structure_detail(raw).contains("is not one of the options"));
    }

    #[test]
    fn test_duplicate_options_are_rejected() {
        let raw = r#"{"questions":[{"question_text":"Q","options":["A","B","B","D"],"correct_answer":"A"}]}"#;
        assert!(structure_detail(raw).contains("duplicate option"));
    }

    #[test]
    fn test_missing_correct_answer_names_the_question() {
        let raw = format!(
            r#"{{"questions":[{first},{{"question_text":"Q2","options":["A","B","C","D"]}}]}}"#,
            first = &BARE[14..BARE.len() - 2]
        );
        assert_eq!(structure_detail(&raw), "question 2: missing correct_answer");
    }

    #[test]
    fn test_log_excerpt_is_bounded_but_error_keeps_full_raw() {
        let raw = "é".repeat(LOG_EXCERPT_CHARS + 10);
        assert_eq!(excerpt(&raw).chars().count(), LOG_EXCERPT_CHARS);
        match ResponseParser::parse(&raw) {
            Err(QuizError::MalformedResponse { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected malformed response, got {other:?}"),
        }
    }
}
