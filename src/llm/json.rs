//! Pulling JSON payloads out of free-form model output.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Strip markdown fences and surrounding prose, returning the text between
/// the first `{` and the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_code_fence(text.trim());
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn strip_code_fence(text: &str) -> &str {
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };
    match body.split_once("```") {
        Some((inner, _)) => inner.trim(),
        None => body.trim(),
    }
}

/// Decode the JSON object embedded in a model response.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json_object(text).context("No JSON object in model response")?;
    serde_json::from_str(json).context("Malformed JSON in model response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        places: Vec<String>,
    }

    #[test]
    fn test_plain_object() {
        let p: Payload = parse_json_object(r#"{"places": ["Louvre"]}"#).unwrap();
        assert_eq!(p.places, vec!["Louvre"]);
    }

    #[test]
    fn test_json_fence() {
        let text = "Sure!\n```json\n{\"places\": [\"Eiffel Tower\"]}\n```\nEnjoy.";
        let p: Payload = parse_json_object(text).unwrap();
        assert_eq!(p.places, vec!["Eiffel Tower"]);
    }

    #[test]
    fn test_bare_fence() {
        let text = "```\n{\"places\": []}\n```";
        assert_eq!(extract_json_object(text), Some("{\"places\": []}"));
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Here you go: {\"places\": [\"Meiji Shrine\"]} hope it helps";
        let p: Payload = parse_json_object(text).unwrap();
        assert_eq!(p.places.len(), 1);
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json_object("I cannot help with that.").is_none());
        assert!(extract_json_object("} backwards {").is_none());
        assert!(parse_json_object::<Payload>("nothing").is_err());
    }

    #[test]
    fn test_truncated_object_fails() {
        assert!(parse_json_object::<Payload>("{\"places\": [\"Louvre\"").is_err());
    }
}
