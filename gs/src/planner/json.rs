//! Recovering a JSON object from free-form model output

use serde_json::Value;
use tracing::debug;

/// Pull the body out of a ```json fence, or any ``` fence
fn strip_fence(text: &str) -> Option<&str> {
    let (start, skip) = match text.find("```json") {
        Some(idx) => (idx, "```json".len()),
        None => (text.find("```")?, "```".len()),
    };
    let body = &text[start + skip..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Extract the first usable JSON object from `text`
///
/// Tries a fenced block, then a direct parse, then the span from the first
/// `{` to the last `}`. Returns `None` when nothing parses to an object.
pub fn extract_json(text: &str) -> Option<Value> {
    debug!(text_len = text.len(), "extract_json: called");
    let candidate = strip_fence(text).unwrap_or(text).trim();

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        debug!("extract_json: direct parse succeeded");
        return value.is_object().then_some(value);
    }

    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end <= start {
        debug!("extract_json: no brace span");
        return None;
    }

    match serde_json::from_str::<Value>(&candidate[start..=end]) {
        Ok(value) if value.is_object() => {
            debug!("extract_json: brace span parse succeeded");
            Some(value)
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "extract_json: brace span parse failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json(r#"{"status": "ready"}"#), Some(json!({"status": "ready"})));
    }

    #[test]
    fn test_json_fence() {
        let text = "Here you go:\n```json\n{\"status\": \"ready\", \"n\": 1}\n```\nThanks";
        assert_eq!(extract_json(text), Some(json!({"status": "ready", "n": 1})));
    }

    #[test]
    fn test_generic_fence() {
        let text = "```\n{\"a\": [1, 2]}\n```";
        assert_eq!(extract_json(text), Some(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_prose_wrapped() {
        let text = "Sure! Based on the input {\"status\": \"need_more_info\"} is my answer.";
        assert_eq!(extract_json(text), Some(json!({"status": "need_more_info"})));
    }

    #[test]
    fn test_nested_braces_use_outer_span() {
        let text = "result: {\"a\": {\"b\": 1}} done";
        assert_eq!(extract_json(text), Some(json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_unrecoverable() {
        assert_eq!(extract_json("I could not decide."), None);
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("{not json at all}"), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn test_non_object_top_level() {
        assert_eq!(extract_json("[1, 2, 3]"), None);
        assert_eq!(extract_json("\"ready\""), None);
    }
}
