//! Citation validation for generator answers.
//!
//! An answer is accepted only when every quote cites a label of the current
//! evidence pack and the summary plus recommendation carry at least one
//! bracket citation, all of them in range.
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^C(\d+)$").unwrap());
static BRACKET_CITE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[C(\d+)\]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CitationViolation {
    #[error("answer is not a JSON object")]
    NotAnObject,
    #[error("'quotes' is missing or not a list")]
    QuotesMissing,
    #[error("quote {0} has no string 'cite'")]
    QuoteCiteMissing(usize),
    #[error("quote {index} cites '{cite}', outside the evidence pack")]
    QuoteOutOfRange { index: usize, cite: String },
    #[error("'{0}' is missing or not a string")]
    FieldMissing(&'static str),
    #[error("summary and recommendation carry no bracket citation")]
    NoCitations,
    #[error("text cites '{0}', outside the evidence pack")]
    TextOutOfRange(String),
}

/// Label number of a quote citation such as `C3` or `[C3]`, surrounding
/// whitespace allowed.
pub fn parse_label(raw: &str) -> Option<usize> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(trimmed);
    LABEL_RE.captures(inner)?.get(1)?.as_str().parse().ok()
}

fn in_range(n: Option<usize>, max_k: usize) -> bool { matches!(n, Some(n) if (1..=max_k).contains(&n)) }

/// Check `answer` against a pack of `max_k` entries labelled `C1..C<max_k>`.
pub fn check_citations(answer: &Value, max_k: usize) -> Result<(), CitationViolation> {
    let obj = answer.as_object().ok_or(CitationViolation::NotAnObject)?;

    let quotes = obj.get("quotes").and_then(Value::as_array).ok_or(CitationViolation::QuotesMissing)?;
    for (index, quote) in quotes.iter().enumerate() {
        let cite = quote.get("cite").and_then(Value::as_str).ok_or(CitationViolation::QuoteCiteMissing(index))?;
        if !in_range(parse_label(cite), max_k) {
            return Err(CitationViolation::QuoteOutOfRange { index, cite: cite.to_string() });
        }
    }

    let text_field = |key: &'static str| obj.get(key).and_then(Value::as_str).ok_or(CitationViolation::FieldMissing(key));
    let combined = format!("{} {}", text_field("summary")?, text_field("recommendation")?);

    let mut found = false;
    for caps in BRACKET_CITE_RE.captures_iter(&combined) {
        found = true;
        if !in_range(caps[1].parse().ok(), max_k) {
            return Err(CitationViolation::TextOutOfRange(caps[0].to_string()));
        }
    }
    if found { Ok(()) } else { Err(CitationViolation::NoCitations) }
}

pub fn valid(answer: &Value, max_k: usize) -> bool { check_citations(answer, max_k).is_ok() }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documented_examples() {
        assert!(valid(&json!({"summary":"x [C1]","recommendation":"y [C2]","quotes":[{"cite":"C1"}]}), 5));
        assert!(!valid(&json!({"summary":"x [C9]","recommendation":"y","quotes":[]}), 5));
        assert!(!valid(&json!({"summary":"no citation","recommendation":"none","quotes":[]}), 5));
        assert!(valid(&json!({"summary":"x [C1]","recommendation":"y [C2]","quotes":[{"cite":"[C1]"}]}), 5));
    }

    #[test]
    fn bare_labels_in_text_do_not_count() {
        let answer = json!({"quotes":[],"summary":"see C1","recommendation":"per C2"});
        assert_eq!(check_citations(&answer, 5), Err(CitationViolation::NoCitations));
    }

    #[test]
    fn accepts_in_range_citations() {
        let answer = json!({"quotes":[{"text":"x","cite":"C2"}],"summary":"Metformin [C2].","recommendation":"Start metformin [C1]."});
        assert!(valid(&answer, 3));
    }

    #[test]
    fn rejects_out_of_range_quote() {
        let answer = json!({"quotes":[{"text":"x","cite":"C4"}],"summary":"a [C1]","recommendation":"b [C1]"});
        assert_eq!(check_citations(&answer, 3), Err(CitationViolation::QuoteOutOfRange { index: 0, cite: "C4".into() }));
    }

    #[test]
    fn rejects_answer_without_bracket_citations() {
        let answer = json!({"quotes":[],"summary":"Metformin.","recommendation":"Start metformin."});
        assert_eq!(check_citations(&answer, 3), Err(CitationViolation::NoCitations));
    }

    #[test]
    fn accepts_bracketed_quote_cite() {
        let answer = json!({"quotes":[{"text":"x","cite":"[C1]"}],"summary":"a [C1]","recommendation":"b"});
        assert!(valid(&answer, 1));
    }

    #[test]
    fn rejects_out_of_range_text_citation() {
        let answer = json!({"quotes":[],"summary":"a [C1]","recommendation":"b [C7]"});
        assert_eq!(check_citations(&answer, 3), Err(CitationViolation::TextOutOfRange("[C7]".into())));
        let zero = json!({"quotes":[],"summary":"a [C0]","recommendation":"b"});
        assert!(!valid(&zero, 3));
    }

    #[test]
    fn rejects_structural_problems() {
        assert_eq!(check_citations(&json!([1]), 3), Err(CitationViolation::NotAnObject));
        assert_eq!(check_citations(&json!({"summary":"a [C1]","recommendation":"b"}), 3), Err(CitationViolation::QuotesMissing));
        assert_eq!(
            check_citations(&json!({"quotes":[{"text":"x"}],"summary":"a [C1]","recommendation":"b"}), 3),
            Err(CitationViolation::QuoteCiteMissing(0))
        );
        assert_eq!(check_citations(&json!({"quotes":[],"summary":"a [C1]"}), 3), Err(CitationViolation::FieldMissing("recommendation")));
        assert_eq!(
            check_citations(&json!({"quotes":[],"summary":"a [C1]","recommendation":7}), 3),
            Err(CitationViolation::FieldMissing("recommendation"))
        );
    }

    #[test]
    fn label_parsing() {
        assert_eq!(parse_label(" C3 "), Some(3));
        assert_eq!(parse_label("[C12]"), Some(12));
        assert_eq!(parse_label("c3"), None);
        assert_eq!(parse_label("C 3"), None);
        assert_eq!(parse_label("C99999999999999999999999"), None);
        assert!(!in_range(parse_label("C1"), 0));
    }
}
