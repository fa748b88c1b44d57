//! Display helpers for frame payloads and counters.

use serde_json::{Map, Number, Value as Json};

use crate::models::Payload;

/// Render a payload for the expanded frame view.
///
/// Producers commonly ship the payload as a JSON document inside a string;
/// such strings are pretty-printed. Anything else is rendered structurally.
///
/// # Examples
///
/// ```
/// use pipetrace_core::formatting::format_payload;
/// use pipetrace_core::models::Payload;
///
/// let p = Payload::from(r#"{"text":"hi"}"#);
/// assert_eq!(format_payload(&p), "{\n  \"text\": \"hi\"\n}");
/// assert_eq!(format_payload(&Payload::from(42)), "42");
/// ```
pub fn format_payload(payload: &Payload) -> String {
    if let Payload::String(s) = payload {
        if let Some(text) = s.as_str() {
            return match serde_json::from_str::<Json>(text) {
                Ok(doc @ (Json::Object(_) | Json::Array(_))) => {
                    serde_json::to_string_pretty(&doc).unwrap_or_else(|_| text.to_string())
                }
                _ => text.to_string(),
            };
        }
    }
    serde_json::to_string_pretty(&payload_to_json(payload)).unwrap_or_default()
}

/// One-line preview of a payload, cut to `max_chars` characters.
pub fn payload_preview(payload: &Payload, max_chars: usize) -> String {
    let flat = match payload {
        Payload::Nil => return String::new(),
        Payload::String(s) => String::from_utf8_lossy(s.as_bytes()).into_owned(),
        other => payload_to_json(other).to_string(),
    };
    let mut out: String = flat.chars().filter(|c| !c.is_control()).take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push('…');
    }
    out
}

/// Convert a MessagePack value into a JSON tree for display.
///
/// Binary and extension values have no JSON counterpart and are shown as hex.
pub fn payload_to_json(value: &Payload) -> Json {
    match value {
        Payload::Nil => Json::Null,
        Payload::Boolean(b) => Json::Bool(*b),
        Payload::Integer(i) => {
            if let Some(n) = i.as_u64() {
                Json::Number(n.into())
            } else if let Some(n) = i.as_i64() {
                Json::Number(n.into())
            } else {
                Json::Null
            }
        }
        Payload::F32(f) => Number::from_f64(f64::from(*f))
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Payload::F64(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Payload::String(s) => match s.as_str() {
            Some(text) => Json::String(text.to_string()),
            None => Json::String(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        },
        Payload::Binary(bytes) => Json::String(hex(bytes)),
        Payload::Array(items) => Json::Array(items.iter().map(payload_to_json).collect()),
        Payload::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                let key = match k {
                    Payload::String(s) => s.as_str().map(str::to_string).unwrap_or_else(|| k.to_string()),
                    other => other.to_string(),
                };
                map.insert(key, payload_to_json(v));
            }
            Json::Object(map)
        }
        Payload::Ext(tag, data) => {
            let mut map = Map::new();
            map.insert("ext".to_string(), Json::Number((*tag).into()));
            map.insert("data".to_string(), Json::String(hex(data)));
            Json::Object(map)
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Format an integer count with thousands separators (e.g. `12345` → `"12,345"`).
pub fn format_count(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_payload_json_string_pretty() {
        let p = Payload::from(r#"{"a":1,"b":[true,null]}"#);
        let out = format_payload(&p);
        assert!(out.contains("\"a\": 1"));
        assert!(out.contains('\n'));
    }

    #[test]
    fn test_format_payload_plain_string_kept() {
        let p = Payload::from("hello world");
        assert_eq!(format_payload(&p), "hello world");
    }

    #[test]
    fn test_format_payload_scalar_json_string_kept_verbatim() {
        // A string that happens to be a JSON scalar is shown as-is.
        let p = Payload::from("123");
        assert_eq!(format_payload(&p), "123");
    }

    #[test]
    fn test_format_payload_structured_map() {
        let p = Payload::Map(vec![
            (Payload::from("text"), Payload::from("hi")),
            (Payload::from(1), Payload::Boolean(false)),
        ]);
        let out = format_payload(&p);
        assert!(out.contains("\"text\": \"hi\""));
        assert!(out.contains("\"1\": false"));
    }

    #[test]
    fn test_payload_to_json_binary_and_ext() {
        assert_eq!(
            payload_to_json(&Payload::Binary(vec![0xde, 0xad])),
            Json::String("0xdead".to_string())
        );
        let ext = payload_to_json(&Payload::Ext(5, vec![1]));
        assert_eq!(ext["ext"], 5);
        assert_eq!(ext["data"], "0x01");
    }

    #[test]
    fn test_payload_to_json_numbers() {
        assert_eq!(payload_to_json(&Payload::from(-3)), Json::from(-3));
        assert_eq!(payload_to_json(&Payload::from(u64::MAX)), Json::from(u64::MAX));
        assert_eq!(payload_to_json(&Payload::F64(f64::NAN)), Json::Null);
    }

    #[test]
    fn test_payload_preview_truncates() {
        let p = Payload::from("abcdefghij");
        assert_eq!(payload_preview(&p, 4), "abcd…");
        assert_eq!(payload_preview(&p, 20), "abcdefghij");
        assert_eq!(payload_preview(&Payload::Nil, 5), "");
    }

    #[test]
    fn test_payload_preview_invalid_utf8_is_lossy() {
        // fixstr of length 2: 'a' followed by a lone 0xff byte.
        let mut rd: &[u8] = &[0xa2, b'a', 0xff];
        let p = rmpv::decode::read_value(&mut rd).unwrap();
        assert!(p.as_str().is_none());
        assert_eq!(payload_preview(&p, 10), "a\u{fffd}");
        assert_eq!(payload_to_json(&p), Json::String("a\u{fffd}".to_string()));
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
