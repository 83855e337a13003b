//! Locating the grade JSON inside free-form model output.

use serde_json::Value;
use tracing::debug;

use super::grade::Grades;
use super::processor::{ResponseError, ResponseResult};

/// The first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count toward nesting, so explained grades with braces in their text
/// still produce the whole object. Returns `None` when there is no `{` or
/// the first one is never closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let candidate = &text[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in candidate.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the grade object embedded in a model's message content.
///
/// Lenient parsing degrades to an empty map when no object can be parsed;
/// strict parsing reports [`ResponseError::UnparseableContent`] instead.
pub fn parse_grades(content: &str, strict: bool) -> ResponseResult<Grades> {
    let reason = match extract_json_object(content) {
        None => "no balanced JSON object in content".to_string(),
        Some(span) => match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(grades)) => return Ok(grades),
            Ok(_) => "embedded JSON is not an object".to_string(),
            Err(err) => err.to_string(),
        },
    };

    if strict {
        return Err(ResponseError::UnparseableContent {
            reason,
            usage: None,
        });
    }

    debug!(%reason, "Could not parse grades, using empty result");
    Ok(Grades::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_object() {
        let text = r#"<think>fine</think> {"citation": 4, "accurate": 5} trailing"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"citation": 4, "accurate": 5}"#)
        );
    }

    #[test]
    fn test_extract_nested_object() {
        let text = r#"{"citation": {"explanation": "ok", "score": 4}, "accurate": 5}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"citation": {"explanation": "uses } and \" {", "score": 2}}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_none_without_brace() {
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_extract_none_when_unbalanced() {
        assert_eq!(extract_json_object(r#"{"citation": 4"#), None);
    }

    #[test]
    fn test_parse_grades_lenient_degrades() {
        assert!(parse_grades("nothing", false).unwrap().is_empty());
        assert!(parse_grades("{citation: 4}", false).unwrap().is_empty());
        assert!(parse_grades("{\"a\": 1", false).unwrap().is_empty());
    }

    #[test]
    fn test_parse_grades_strict_errors() {
        let err = parse_grades("{citation: 4}", true).unwrap_err();
        assert!(matches!(err, ResponseError::UnparseableContent { .. }));
    }

    #[test]
    fn test_parse_grades_keeps_response_order() {
        let grades = parse_grades(r#"Result: {"thorough": 3, "citation": 1}"#, true).unwrap();
        let keys: Vec<&str> = grades.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["thorough", "citation"]);
        assert_eq!(grades["thorough"], json!(3));
    }
}
