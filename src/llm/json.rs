//! Pull the JSON object out of a model reply.
//!
//! Replies arrive wrapped in code fences, preceded by reasoning blocks, or
//! followed by commentary. The first object that parses wins.

use serde_json::Value;

pub fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_reasoning(raw).trim();
    if text.is_empty() {
        return None;
    }

    let unfenced = strip_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    first_balanced_object(text)
}

/// Unwrap `{"<stage>": {...}}` into the inner object.
pub fn unwrap_envelope(value: Value, stage: &str) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.get(stage).is_some_and(Value::is_object) => {
            map.remove(stage).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn strip_reasoning(raw: &str) -> &str {
    match raw.rfind("</think>") {
        Some(end) => &raw[end + "</think>".len()..],
        None => raw,
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // Skip the language tag line, e.g. ```json
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn first_balanced_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        // An unclosed brace may be stray prose; try the next one.
        if let Some(end) = end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(value);
            }
        }
        search_from = start + 1;
    }

    None
}
