//! Message decoder.
//!
//! A delivered buffer holds zero or more complete, back-to-back records. Each
//! record is a map with a string `type` discriminator. Decoding is
//! all-or-nothing per buffer: one malformed record discards the whole batch.

use std::io::Cursor;

use pipetrace_core::error::DecodeError;
use pipetrace_core::models::{Frame, FrameKind, TopologySnapshot};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Discriminator of topology records.
pub const TOPOLOGY_TYPE: &str = "pipeline";

/// Deepest nesting accepted inside one MessagePack record. JSON lines get the
/// same bound from `serde_json`'s recursion limit.
pub const MAX_DEPTH: usize = 128;

/// A typed protocol record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Topology(TopologySnapshot),
    Frame(Frame),
}

/// How the bytes of a buffer are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Concatenated MessagePack values (binary socket messages, capture files).
    MsgPack,
    /// Newline-delimited JSON documents (text socket messages).
    JsonLines,
}

/// Decode a buffer in the given encoding, preserving record order.
pub fn decode(buf: &[u8], encoding: Encoding) -> Result<Vec<Record>, DecodeError> {
    match encoding {
        Encoding::MsgPack => decode_msgpack(buf),
        Encoding::JsonLines => {
            let text = std::str::from_utf8(buf).map_err(|source| DecodeError::Utf8 { source })?;
            decode_json_lines(text)
        }
    }
}

/// Decode concatenated MessagePack records.
///
/// Each record is first read as a generic value to find its boundaries and
/// discriminator, then its bytes are deserialized into the typed record.
pub fn decode_msgpack(buf: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let mut cursor = Cursor::new(buf);
    let mut records = Vec::new();
    let mut index = 0;

    while (cursor.position() as usize) < buf.len() {
        let offset = cursor.position();
        let value = rmpv::decode::read_value_with_max_depth(&mut cursor, MAX_DEPTH)
            .map_err(|source| DecodeError::MsgPack { offset, source })?;
        let raw = &buf[offset as usize..cursor.position() as usize];

        let tag = msgpack_discriminator(&value).ok_or(DecodeError::MissingDiscriminator { index })?;
        if let Some(record) = interpret(tag, index, MsgPackRecord(raw))? {
            records.push(record);
        }
        index += 1;
    }

    Ok(records)
}

/// Decode newline-delimited JSON records. Blank lines are skipped and `\r\n`
/// line endings are accepted.
pub fn decode_json_lines(text: &str) -> Result<Vec<Record>, DecodeError> {
    let mut records = Vec::new();
    let mut index = 0;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|source| DecodeError::Json {
                line: line_no + 1,
                source,
            })?;

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or(DecodeError::MissingDiscriminator { index })?;
        if let Some(record) = interpret(&tag, index, JsonRecord(value))? {
            records.push(record);
        }
        index += 1;
    }

    Ok(records)
}

// ── Typed conversion ──────────────────────────────────────────────────────────

/// One record in its wire form, convertible into any typed record.
trait RecordSource {
    fn into_typed<T: DeserializeOwned>(self) -> Result<T, String>;
}

/// The exact bytes of one MessagePack record.
struct MsgPackRecord<'a>(&'a [u8]);

impl RecordSource for MsgPackRecord<'_> {
    fn into_typed<T: DeserializeOwned>(self) -> Result<T, String> {
        rmp_serde::from_slice(self.0).map_err(|e| e.to_string())
    }
}

struct JsonRecord(serde_json::Value);

impl RecordSource for JsonRecord {
    fn into_typed<T: DeserializeOwned>(self) -> Result<T, String> {
        serde_json::from_value(self.0).map_err(|e| e.to_string())
    }
}

/// Turn one record into a typed record, or `None` for a type this client
/// does not know.
fn interpret<S: RecordSource>(tag: &str, index: usize, source: S) -> Result<Option<Record>, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidRecord {
        record_type: tag.to_string(),
        index,
        reason,
    };

    if tag == TOPOLOGY_TYPE {
        let snapshot: TopologySnapshot = source.into_typed().map_err(invalid)?;
        return Ok(Some(Record::Topology(snapshot)));
    }

    if let Some(kind) = FrameKind::from_discriminator(tag) {
        let mut frame: Frame = source.into_typed().map_err(invalid)?;
        frame.kind = kind;
        return Ok(Some(Record::Frame(frame)));
    }

    debug!(record_type = %tag, index, "skipping record of unknown type");
    Ok(None)
}

fn msgpack_discriminator(value: &rmpv::Value) -> Option<&str> {
    match value {
        rmpv::Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.as_str() == Some("type"))
            .and_then(|(_, v)| v.as_str()),
        _ => None,
    }
}
