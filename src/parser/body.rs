//! Request body decoding.

use serde_json::{Map, Value};

/// Decode a raw request body according to its Content-Type.
///
/// JSON bodies become JSON values and URL-encoded forms become objects, with
/// repeated keys collected into arrays. A body that fails to decode falls
/// back to its text, and a body that is empty or not UTF-8 is absent.
pub fn decode_body(raw: &[u8], content_type: Option<&str>) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }

    let text = std::str::from_utf8(raw).ok()?;
    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let decoded = if media_type == "application/json" || media_type.ends_with("+json") {
        serde_json::from_str(text).ok()
    } else if media_type == "application/x-www-form-urlencoded" {
        decode_form(text)
    } else {
        None
    };

    Some(decoded.unwrap_or_else(|| Value::String(text.to_string())))
}

fn decode_form(text: &str) -> Option<Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text).ok()?;

    let mut form = Map::new();
    for (key, value) in pairs {
        match form.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                form.insert(key, Value::String(value));
            }
        }
    }

    Some(Value::Object(form))
}
