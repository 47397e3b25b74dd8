//! JSON extraction utilities for parsing LLM responses.
//!
//! Models frequently wrap their answer in markdown fences or surround it with
//! prose. These helpers locate the first JSON object in such text. Strategies,
//! tried in order by [`extract_json_object`]:
//! 1. JSON in a ```` ```json ```` code block
//! 2. JSON in a generic code block
//! 3. The first balanced `{...}` span anywhere in the content
//!
//! # Example
//!
//! ```
//! use augment_forge::utils::json_extraction::extract_json_object;
//!
//! let response = "Here you go: {\"question\": \"Why?\", \"answer\": \"Because.\"} Enjoy!";
//! let json = extract_json_object(response).expect("object present");
//! assert_eq!(json, "{\"question\": \"Why?\", \"answer\": \"Because.\"}");
//! ```

use regex::Regex;

/// Extracts the first JSON object candidate from `content`.
///
/// The returned slice is not validated; callers still have to parse it.
pub fn extract_json_object(content: &str) -> Option<String> {
    extract_from_json_code_block(content)
        .or_else(|| extract_from_generic_code_block(content))
        .or_else(|| extract_first_balanced_object(content))
}

/// Helper function to find the matching closing brace for a JSON object.
///
/// Braces inside string literals (including escaped quotes) are ignored.
///
/// # Arguments
///
/// * `s` - A string starting with '{'
///
/// # Returns
///
/// The byte index of the matching '}', or None if the object is unbalanced.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract JSON from a ```` ```json ... ``` ```` code block.
pub fn extract_from_json_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```json\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let json_content = caps.get(1)?.as_str().trim();
    if json_content.starts_with('{') {
        if let Some(end) = find_matching_brace(json_content) {
            return Some(json_content[..=end].to_string());
        }
        return Some(json_content.to_string());
    }
    None
}

/// Extract JSON from a generic ``` ... ``` code block.
pub fn extract_from_generic_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    let block_content = caps.get(1)?.as_str().trim();
    let start = block_content.find('{')?;
    let end = find_matching_brace(&block_content[start..])?;
    Some(block_content[start..=start + end].to_string())
}

/// Extract the first balanced `{...}` span, scanning past unbalanced openers.
pub fn extract_first_balanced_object(content: &str) -> Option<String> {
    let mut offset = 0;
    while let Some(pos) = content[offset..].find('{') {
        let start = offset + pos;
        if let Some(end) = find_matching_brace(&content[start..]) {
            return Some(content[start..=start + end].to_string());
        }
        offset = start + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_matching_brace_nested() {
        let s = r#"{"a": {"b": "}"}, "c": 1} trailing"#;
        let end = find_matching_brace(s).expect("balanced");
        assert_eq!(&s[..=end], r#"{"a": {"b": "}"}, "c": 1}"#);
    }

    #[test]
    fn test_find_matching_brace_escaped_quote() {
        let s = r#"{"a": "say \"}\""}"#;
        assert_eq!(find_matching_brace(s), Some(s.len() - 1));
    }

    #[test]
    fn test_find_matching_brace_unbalanced() {
        assert_eq!(find_matching_brace(r#"{"a": {"b": 1}"#), None);
        assert_eq!(find_matching_brace("}"), None);
    }

    #[test]
    fn test_json_code_block() {
        let content = "Sure!\n```json\n{\"q\": \"x\"}\n```\nDone.";
        assert_eq!(
            extract_from_json_code_block(content),
            Some("{\"q\": \"x\"}".to_string())
        );
    }

    #[test]
    fn test_generic_code_block() {
        let content = "```\nresult = {\"q\": 1}\n```";
        assert_eq!(
            extract_from_generic_code_block(content),
            Some("{\"q\": 1}".to_string())
        );
    }

    #[test]
    fn test_first_balanced_object_skips_unbalanced_prefix() {
        let content = "noise { not closed ... then {\"ok\": true} end";
        assert_eq!(
            extract_first_balanced_object(content),
            Some("{\"ok\": true}".to_string())
        );
    }

    #[test]
    fn test_extract_json_object_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("[1, 2, 3]"), None);
    }
}
