//! Lenient extraction of JSON objects from free-form model replies.

/// Returns the first balanced `{...}` span in `text`.
///
/// Braces inside JSON string literals are ignored, so prose or code fences
/// around the object do not matter.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, character) in text[start..].char_indices() {
        if in_string {
            match character {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match character {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
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
    fn test_extracts_object_from_prose() {
        let reply = "Sure! Here it is:\n```json\n{\"a\": {\"b\": 1}}\n```\nAnything else?";
        assert_eq!(extract_json_object(reply), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_ignores_braces_inside_strings() {
        let reply = r#"{"text": "use } and { freely", "n": 2} trailing {"#;
        assert_eq!(
            extract_json_object(reply),
            Some(r#"{"text": "use } and { freely", "n": 2}"#)
        );
    }

    #[test]
    fn test_unbalanced_or_missing_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"open\": true"), None);
    }
}
