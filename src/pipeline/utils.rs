//! Helpers for reading JSON out of service responses
//!
//! Analysis services sit in front of language models and sometimes return the
//! payload wrapped in prose or a markdown code block.

/// Strip a surrounding ```json / ``` block, if any
fn unfence(text: &str) -> &str {
    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        let content_start = text[block_start..]
            .find('\n')
            .map(|i| block_start + i + 1)
            .unwrap_or(block_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }
    text.trim()
}

/// Slice from the first `open` to the last `close`
fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Extract a JSON object from a response that might contain markdown or other text
pub fn extract_json_object(text: &str) -> Option<&str> {
    delimited(unfence(text), '{', '}')
}

/// Extract a JSON array from a response that might contain markdown or other text
pub fn extract_json_array(text: &str) -> Option<&str> {
    delimited(unfence(text), '[', ']')
}

/// Parse a response body that is either `{"<key>": [...]}` or a bare array,
/// possibly wrapped in markdown
pub fn parse_list_response<T>(body: &str, key: &str) -> Result<Vec<T>, String>
where
    T: serde::de::DeserializeOwned,
{
    let body = unfence(body);

    // Bare array first when the payload starts with one
    if body.starts_with('[') {
        if let Some(array) = extract_json_array(body) {
            return serde_json::from_str(array).map_err(|e| e.to_string());
        }
    }

    if let Some(object) = extract_json_object(body) {
        let mut value: serde_json::Value =
            serde_json::from_str(object).map_err(|e| e.to_string())?;
        let list = value
            .get_mut(key)
            .map(serde_json::Value::take)
            .ok_or_else(|| format!("response has no '{}' field", key))?;
        return serde_json::from_value(list).map_err(|e| e.to_string());
    }

    if let Some(array) = extract_json_array(body) {
        return serde_json::from_str(array).map_err(|e| e.to_string());
    }

    Err("No JSON found in response".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_from_code_block() {
        let text = r#"Here's the result:
```json
{"key": "value", "number": 42}
```
That's it."#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"key": "value", "number": 42}"#)
        );
    }

    #[test]
    fn test_extract_json_object_raw() {
        let text = r#"Result: {"name": "test"} done"#;
        assert_eq!(extract_json_object(text), Some(r#"{"name": "test"}"#));
    }

    #[test]
    fn test_extract_json_array_from_plain_block() {
        let text = "Results:\n```\n[{\"id\": 1}, {\"id\": 2}]\n```\nEnd.";
        let array = extract_json_array(text).unwrap();
        assert!(array.starts_with('['));
        assert!(array.ends_with(']'));
    }

    #[test]
    fn test_no_json() {
        assert_eq!(extract_json_object("nothing here"), None);
        assert_eq!(extract_json_array("} backwards {"), None);
    }

    #[test]
    fn test_parse_list_response_shapes() {
        let wrapped: Vec<u32> = parse_list_response(r#"{"items": [1, 2, 3]}"#, "items").unwrap();
        assert_eq!(wrapped, vec![1, 2, 3]);

        let bare: Vec<u32> = parse_list_response("[4, 5]", "items").unwrap();
        assert_eq!(bare, vec![4, 5]);

        let fenced: Vec<u32> =
            parse_list_response("Sure!\n```json\n{\"items\": [6]}\n```", "items").unwrap();
        assert_eq!(fenced, vec![6]);
    }

    #[test]
    fn test_parse_list_response_missing_key() {
        let err = parse_list_response::<u32>(r#"{"other": []}"#, "items").unwrap_err();
        assert!(err.contains("items"));
    }
}
