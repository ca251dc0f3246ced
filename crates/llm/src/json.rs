//! JSON payload extraction from free-form model output.
//!
//! Models wrap JSON in code fences, preambles and trailing commentary. A
//! fence that opens the reply is taken as the payload wrapper; otherwise the
//! whole reply is scanned for the first balanced `{...}` or `[...]` span, and
//! a fenced block further down is only tried when that scan fails. Brackets
//! inside string literals are skipped, so a title such as `"use {} here"`
//! does not end the span early. Only a JSON object counts as a payload.

use serde_json::{json, Value};

/// Key of the fallback object returned for unparseable output.
pub const RAW_RESPONSE_KEY: &str = "raw_response";

/// Parse the JSON object embedded in `raw`.
///
/// Returns `{"raw_response": raw}` when no JSON object can be recovered,
/// including when the payload is a bare scalar or an array.
pub fn extract_json(raw: &str) -> Value {
    let text = raw.trim();
    let fenced = strip_code_fence(text);

    let candidates = if text.starts_with("```") {
        [fenced, text]
    } else {
        [text, fenced]
    };

    for candidate in candidates {
        let payload = balanced_span(candidate).unwrap_or(candidate);
        match serde_json::from_str::<Value>(payload) {
            Ok(value) if value.is_object() => return value,
            Ok(value) => {
                tracing::warn!("Model output was JSON but not an object: {}", value);
            }
            Err(e) => tracing::debug!("Candidate payload was not valid JSON: {}", e),
        }
    }

    tracing::warn!("Model output held no JSON object; keeping the raw text");
    json!({ RAW_RESPONSE_KEY: raw })
}

/// Whether a structured result is the unparsed fallback object.
pub fn is_raw_response(value: &Value) -> bool {
    match value.as_object() {
        Some(map) => map.len() == 1 && map.get(RAW_RESPONSE_KEY).is_some_and(Value::is_string),
        None => false,
    }
}

/// Return the body of the first triple-backtick block, or the input unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };

    let after = &text[open + 3..];

    // Skip an info string such as `json` on the opening line
    let body = match after.find('\n') {
        Some(newline) if after[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after[newline + 1..]
        }
        _ => after,
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Slice from the first opening bracket to its matching close.
fn balanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_payload_with_preamble() {
        let raw = "Here is your answer:\n```json\n{\"a\":1,\"b\":{\"c\":2}}\n```\nThanks";
        assert_eq!(extract_json(raw), json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_bare_payload_with_commentary() {
        let raw = "Sure! {\"explanation\": \"x\", \"key_points\": [\"a\"]} Hope this helps.";
        assert_eq!(
            extract_json(raw),
            json!({"explanation": "x", "key_points": ["a"]})
        );
    }

    #[test]
    fn test_top_level_array_is_not_a_payload() {
        let value = extract_json("list: [1, [2, 3]] done");
        assert!(is_raw_response(&value));
    }

    #[test]
    fn test_bare_scalar_is_not_a_payload() {
        for raw in ["42", "\"just text\"", "true"] {
            let value = extract_json(raw);
            assert!(is_raw_response(&value), "{} should fall back", raw);
            assert_eq!(value[RAW_RESPONSE_KEY], raw);
        }
    }

    #[test]
    fn test_payload_before_trailing_code_block() {
        let raw = "{\"explanation\": \"Install it\", \"key_points\": [\"npm\"]}\n\nFor example:\n```bash\nnpm install react\n```";
        let value = extract_json(raw);
        assert!(!is_raw_response(&value));
        assert_eq!(value["explanation"], "Install it");
    }

    #[test]
    fn test_fenced_payload_after_bracketed_preamble() {
        let raw = "Steps [draft]:\n```json\n{\"ok\": true}\n```";
        assert_eq!(extract_json(raw), json!({"ok": true}));
    }

    #[test]
    fn test_brackets_inside_strings() {
        let raw = r#"Result: {"title": "Objects use } and { freely", "tags": ["]"]} trailing"#;
        assert_eq!(
            extract_json(raw),
            json!({"title": "Objects use } and { freely", "tags": ["]"]})
        );
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let raw = r#"{"quote": "she said \"}\" loudly", "n": 1}"#;
        assert_eq!(extract_json(raw)["n"], 1);
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\n{\"ok\": true}\n```";
        assert_eq!(extract_json(raw), json!({"ok": true}));
    }

    #[test]
    fn test_unparseable_output_falls_back() {
        let raw = "I cannot produce JSON today.";
        let value = extract_json(raw);
        assert!(is_raw_response(&value));
        assert_eq!(value[RAW_RESPONSE_KEY], raw);
    }

    #[test]
    fn test_unbalanced_output_falls_back() {
        let raw = "{\"a\": {\"b\": 1}";
        assert!(is_raw_response(&extract_json(raw)));
    }

    #[test]
    fn test_structured_value_is_not_raw() {
        assert!(!is_raw_response(&json!({"raw_response": "x", "other": 1})));
        assert!(!is_raw_response(&json!({"explanation": "x"})));
    }
}
