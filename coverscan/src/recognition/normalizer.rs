//! Turns free-form provider replies into a [`RecognitionResult`].
//!
//! Extraction is tried in order and the first strategy that yields a value wins:
//!
//! 1. the greedy `{ ... }` span parsed as a JSON object with `title`/`author` keys
//! 2. `Title:` / `Author:` labeled lines, matched case-insensitively
//! 3. sentinel values
//!
//! Each strategy carries a fixed confidence tier. Nothing in here returns an
//! error: a reply that fits no strategy simply lands in the lowest tier.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{clamp_confidence, RecognitionResult};

/// Confidence for a reply that parsed as a structured object, unless the
/// provider declared its own.
pub const STRUCTURED_CONFIDENCE: f32 = 0.9;
/// Confidence for values recovered from `Title:` / `Author:` lines.
pub const LABELED_LINE_CONFIDENCE: f32 = 0.5;
/// Confidence when neither strategy recovered anything.
pub const UNKNOWN_CONFIDENCE: f32 = 0.1;

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(title|author)\b[\s*_]*:").expect("label pattern is valid")
});

/// Which extraction strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Structured,
    LabeledLines,
    Unknown,
}

impl ExtractionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::LabeledLines => "labeled_lines",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Extracted {
    title: Option<String>,
    author: Option<String>,
    confidence: Option<f32>,
}

impl Extracted {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none()
    }
}

/// Normalize a raw provider reply. `confidence_hint` is the provider-declared
/// confidence, if the provider reports one outside of the reply text.
pub fn normalize(raw: &str, confidence_hint: Option<f32>) -> RecognitionResult {
    normalize_with_tier(raw, confidence_hint).0
}

/// Same as [`normalize`], also reporting which strategy succeeded.
pub fn normalize_with_tier(
    raw: &str,
    confidence_hint: Option<f32>,
) -> (RecognitionResult, ExtractionTier) {
    if let Some(extracted) = extract_structured(raw) {
        let declared = extracted.confidence.or(confidence_hint);
        let confidence = clamp_confidence(
            declared.unwrap_or(STRUCTURED_CONFIDENCE),
            STRUCTURED_CONFIDENCE,
        );
        let result = RecognitionResult::new(
            extracted.title.as_deref(),
            extracted.author.as_deref(),
            confidence,
        );
        return (result, ExtractionTier::Structured);
    }

    let labeled = extract_labeled_lines(raw);
    if !labeled.is_empty() {
        let result = RecognitionResult::new(
            labeled.title.as_deref(),
            labeled.author.as_deref(),
            LABELED_LINE_CONFIDENCE,
        );
        return (result, ExtractionTier::LabeledLines);
    }

    (
        RecognitionResult::new(None, None, UNKNOWN_CONFIDENCE),
        ExtractionTier::Unknown,
    )
}

fn extract_structured(raw: &str) -> Option<Extracted> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;

    let extracted = Extracted {
        title: string_field(object, "title"),
        author: string_field(object, "author"),
        confidence: object_field(object, "confidence")
            .and_then(Value::as_f64)
            .map(|c| c as f32),
    };

    if extracted.is_empty() {
        None
    } else {
        Some(extracted)
    }
}

fn object_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// String value of `key`. Numbers and booleans are rendered as text; arrays
/// of strings (co-authors) are joined with ", ".
fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match object_field(object, key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// A label may appear anywhere in a line; its value runs to the next label
/// on the same line or to the end of the line.
fn extract_labeled_lines(raw: &str) -> Extracted {
    let mut extracted = Extracted::default();

    for line in raw.lines() {
        let labels: Vec<_> = LABEL.captures_iter(line).collect();
        for (i, captures) in labels.iter().enumerate() {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let end = labels
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(line.len(), |next| next.start());
            let value = clean_label_value(&line[whole.end()..end]);
            if value.is_empty() {
                continue;
            }

            let slot = if name.as_str().eq_ignore_ascii_case("title") {
                &mut extracted.title
            } else {
                &mut extracted.author
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        if extracted.title.is_some() && extracted.author.is_some() {
            break;
        }
    }

    extracted
}

fn clean_label_value(value: &str) -> String {
    value
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '*' | '_' | '"' | '`' | ',' | ';' | '{' | '}')
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UNKNOWN_AUTHOR, UNKNOWN_TITLE};

    #[test]
    fn test_structured_reply_with_surrounding_prose() {
        let raw = "Sure! Here is what I found:\n```json\n{\"title\": \"Dune\", \"author\": \"Frank Herbert\"}\n```\nHope that helps.";
        let (result, tier) = normalize_with_tier(raw, None);
        assert_eq!(tier, ExtractionTier::Structured);
        assert_eq!(result.title, "Dune");
        assert_eq!(result.author, "Frank Herbert");
        assert_eq!(result.confidence, STRUCTURED_CONFIDENCE);
    }

    #[test]
    fn test_structured_reply_prefers_declared_confidence() {
        let raw = r#"{"title": "Emma", "author": "Jane Austen", "confidence": 0.72}"#;
        let result = normalize(raw, Some(0.3));
        assert!((result.confidence - 0.72).abs() < f32::EPSILON);
    }

    #[test]
    fn test_structured_reply_uses_hint_when_undeclared() {
        let raw = r#"{"title": "Emma", "author": "Jane Austen"}"#;
        assert_eq!(normalize(raw, Some(0.4)).confidence, 0.4);
    }

    #[test]
    fn test_structured_confidence_out_of_range_is_clamped() {
        let raw = r#"{"title": "Emma", "author": "Jane Austen", "confidence": 97}"#;
        assert_eq!(normalize(raw, None).confidence, 1.0);
    }

    #[test]
    fn test_structured_reply_missing_author_uses_sentinel() {
        let raw = r#"{"title": "The Hobbit"}"#;
        let (result, tier) = normalize_with_tier(raw, None);
        assert_eq!(tier, ExtractionTier::Structured);
        assert_eq!(result.title, "The Hobbit");
        assert_eq!(result.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_structured_keys_are_case_insensitive_and_authors_joined() {
        let raw = r#"{"Title": "Good Omens", "AUTHOR": ["Terry Pratchett", "Neil Gaiman"]}"#;
        let result = normalize(raw, None);
        assert_eq!(result.title, "Good Omens");
        assert_eq!(result.author, "Terry Pratchett, Neil Gaiman");
    }

    #[test]
    fn test_structured_numeric_title_is_kept() {
        let (result, tier) =
            normalize_with_tier(r#"{"title": 1984, "author": "George Orwell"}"#, None);
        assert_eq!(tier, ExtractionTier::Structured);
        assert_eq!(result.title, "1984");
        assert_eq!(result.author, "George Orwell");
        assert_eq!(result.confidence, STRUCTURED_CONFIDENCE);
    }

    #[test]
    fn test_object_without_known_keys_falls_through() {
        let raw = "{\"book\": \"x\"}\nTitle: Beloved\nAuthor: Toni Morrison";
        let (result, tier) = normalize_with_tier(raw, None);
        assert_eq!(tier, ExtractionTier::LabeledLines);
        assert_eq!(result.title, "Beloved");
    }

    #[test]
    fn test_labeled_lines() {
        let raw = "The cover shows:\n   TITLE:   Moby Dick  \n author: Herman Melville\n";
        let (result, tier) = normalize_with_tier(raw, None);
        assert_eq!(tier, ExtractionTier::LabeledLines);
        assert_eq!(result.title, "Moby Dick");
        assert_eq!(result.author, "Herman Melville");
        assert_eq!(result.confidence, LABELED_LINE_CONFIDENCE);
    }

    #[test]
    fn test_labeled_lines_with_markdown_decoration() {
        let raw = "- **Title:** \"Middlemarch\"\n- **Author:** George Eliot";
        let result = normalize(raw, None);
        assert_eq!(result.title, "Middlemarch");
        assert_eq!(result.author, "George Eliot");
    }

    #[test]
    fn test_labeled_lines_with_only_title() {
        let result = normalize("Title: Ulysses", None);
        assert_eq!(result.title, "Ulysses");
        assert_eq!(result.author, UNKNOWN_AUTHOR);
        assert_eq!(result.confidence, LABELED_LINE_CONFIDENCE);
    }

    #[test]
    fn test_subtitle_is_not_a_title_label() {
        let (result, tier) = normalize_with_tier("Subtitle: A Novel", None);
        assert_eq!(tier, ExtractionTier::Unknown);
        assert_eq!(result.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_unparseable_braces_fall_back_to_labels() {
        let raw = "{title: Dracula, author: Bram Stoker}\nTitle: Dracula\nAuthor: Bram Stoker";
        let (result, tier) = normalize_with_tier(raw, None);
        assert_eq!(tier, ExtractionTier::LabeledLines);
        assert_eq!(result.title, "Dracula");
        assert_eq!(result.author, "Bram Stoker");
    }

    #[test]
    fn test_labels_after_leading_words() {
        let (result, tier) = normalize_with_tier("The title: Dune\nThe author: Frank Herbert", None);
        assert_eq!(tier, ExtractionTier::LabeledLines);
        assert_eq!(result.title, "Dune");
        assert_eq!(result.author, "Frank Herbert");

        let result = normalize("Written by author: Frank Herbert", None);
        assert_eq!(result.author, "Frank Herbert");
        assert_eq!(result.title, UNKNOWN_TITLE);
        assert_eq!(result.confidence, LABELED_LINE_CONFIDENCE);
    }

    #[test]
    fn test_two_labels_on_one_line() {
        let result = normalize("Book title: Solaris; author: Stanislaw Lem", None);
        assert_eq!(result.title, "Solaris");
        assert_eq!(result.author, "Stanislaw Lem");
    }

    #[test]
    fn test_unknown_reply() {
        let (result, tier) = normalize_with_tier("I cannot read this image.", None);
        assert_eq!(tier, ExtractionTier::Unknown);
        assert_eq!(result.title, UNKNOWN_TITLE);
        assert_eq!(result.author, UNKNOWN_AUTHOR);
        assert_eq!(result.confidence, UNKNOWN_CONFIDENCE);
    }

    #[test]
    fn test_empty_values_are_replaced_per_field() {
        let raw = r#"{"title": "   ", "author": "Homer"}"#;
        let result = normalize(raw, None);
        assert_eq!(result.title, UNKNOWN_TITLE);
        assert_eq!(result.author, "Homer");
    }

    #[test]
    fn test_hostile_inputs_never_escape_bounds() {
        let nested = format!("{}{}", "{\"a\":".repeat(500), "}".repeat(500));
        let garbage = String::from_utf8_lossy(&[0xff, 0x00, 0x7b, 0xfe, 0x7d, 0x0a]).to_string();
        let inputs = [
            String::new(),
            "}{".to_string(),
            "{".to_string(),
            nested,
            garbage,
            "title:\nauthor:".to_string(),
        ];

        for input in inputs {
            let result = normalize(&input, Some(f32::INFINITY));
            assert!(!result.title.is_empty());
            assert!(!result.author.is_empty());
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn test_tier_names() {
        assert_eq!(ExtractionTier::Structured.as_str(), "structured");
        assert_eq!(ExtractionTier::Unknown.as_str(), "unknown");
    }
}
