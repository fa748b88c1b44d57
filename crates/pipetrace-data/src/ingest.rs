//! Buffer ingestion: decoder output applied to the session store.

use pipetrace_core::error::DecodeError;
use pipetrace_core::models::Frame;
use tracing::{debug, warn};

use crate::decoder::{self, Encoding, Record};
use crate::session::Session;

/// What one buffer contributed to the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub topologies: usize,
    pub frames: usize,
}

/// Decode `buf` and apply its records to `session` in decoded order.
///
/// A buffer that fails to decode is discarded as a whole and the session is
/// left untouched; the error is logged here and returned so the caller can
/// surface it.
pub fn ingest(session: &mut Session, buf: &[u8], encoding: Encoding) -> Result<IngestSummary, DecodeError> {
    match decoder::decode(buf, encoding) {
        Ok(records) => {
            let summary = apply_records(session, records);
            debug!(
                bytes = buf.len(),
                topologies = summary.topologies,
                frames = summary.frames,
                "buffer applied"
            );
            Ok(summary)
        }
        Err(e) => {
            warn!(bytes = buf.len(), error = %e, "discarding undecodable buffer");
            Err(e)
        }
    }
}

/// Apply already-decoded records.
///
/// Consecutive frames are recorded as one batch. A topology record flushes
/// the frames before it and then replaces the session, so those frames are
/// dropped with the rest of the old session.
pub fn apply_records(session: &mut Session, records: Vec<Record>) -> IngestSummary {
    let mut summary = IngestSummary::default();
    let mut pending: Vec<Frame> = Vec::new();

    for record in records {
        match record {
            Record::Frame(frame) => {
                summary.frames += 1;
                pending.push(frame);
            }
            Record::Topology(snapshot) => {
                if !pending.is_empty() {
                    session.record_frames(pending.drain(..));
                }
                summary.topologies += 1;
                session.apply_topology(snapshot);
            }
        }
    }

    if !pending.is_empty() {
        session.record_frames(pending);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pack(values: &[serde_json::Value]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|v| rmp_serde::to_vec_named(v).unwrap())
            .collect()
    }

    fn topology() -> serde_json::Value {
        json!({
            "type": "pipeline",
            "processors": [
                {"id": "a", "name": "STT", "parent": null, "type": "service"},
                {"id": "b", "name": "LLM", "parent": null, "type": "service"}
            ],
            "connections": [{"from": "a", "to": "b"}]
        })
    }

    fn frame(id: u64, from: &str, event: &str, ts: u64) -> serde_json::Value {
        json!({
            "type": "frame",
            "id": id,
            "name": "TextFrame#1",
            "from": from,
            "event": event,
            "direction": "downstream",
            "timestamp": ts,
            "payload": {"text": "hi"}
        })
    }

    #[test]
    fn test_ingest_scenario_buffer() {
        let mut s = Session::new();
        let buf = pack(&[topology(), frame(1, "a", "push", 100), frame(2, "b", "process", 150)]);

        let summary = ingest(&mut s, &buf, Encoding::MsgPack).unwrap();
        assert_eq!(summary, IngestSummary { topologies: 1, frames: 2 });
        assert_eq!(s.topology().processors().len(), 2);
        assert_eq!(s.frame_path("TextFrame#1"), ["a", "b"]);
    }

    #[test]
    fn test_malformed_buffer_leaves_session_untouched() {
        let mut s = Session::new();
        ingest(&mut s, &pack(&[topology(), frame(1, "a", "push", 100)]), Encoding::MsgPack).unwrap();
        let before = s.revisions();

        let mut bad = pack(&[frame(2, "b", "push", 110)]);
        bad.extend(pack(&[frame(3, "b", "push", 120)]));
        bad.truncate(bad.len() - 3);

        assert!(ingest(&mut s, &bad, Encoding::MsgPack).is_err());
        assert_eq!(s.total_frames(), 1);
        assert_eq!(s.log_len("b"), 0);
        assert_eq!(s.revisions(), before);
    }

    #[test]
    fn test_buffers_apply_in_arrival_order() {
        let mut s = Session::new();
        ingest(&mut s, &pack(&[topology()]), Encoding::MsgPack).unwrap();
        ingest(&mut s, &pack(&[frame(1, "b", "push", 500)]), Encoding::MsgPack).unwrap();
        ingest(&mut s, &pack(&[frame(2, "a", "push", 100)]), Encoding::MsgPack).unwrap();

        // Path order follows application, not timestamps.
        assert_eq!(s.frame_path("TextFrame#1"), ["b", "a"]);
    }

    #[test]
    fn test_frames_before_topology_in_same_buffer_are_reset() {
        let mut s = Session::new();
        let buf = pack(&[frame(1, "a", "push", 100), topology(), frame(2, "b", "push", 110)]);
        let summary = ingest(&mut s, &buf, Encoding::MsgPack).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(s.log_len("a"), 0);
        assert_eq!(s.log_len("b"), 1);
        assert_eq!(s.frame_path("TextFrame#1"), ["b"]);
    }

    #[test]
    fn test_json_lines_ingest() {
        let mut s = Session::new();
        let text = format!("{}\n{}\n", topology(), frame(1, "a", "push", 100));
        let summary = ingest(&mut s, text.as_bytes(), Encoding::JsonLines).unwrap();
        assert_eq!(summary.frames, 1);
        assert_eq!(s.log_len("a"), 1);
    }

    #[test]
    fn test_empty_buffer_is_noop() {
        let mut s = Session::new();
        let before = s.revisions();
        assert_eq!(ingest(&mut s, &[], Encoding::MsgPack).unwrap(), IngestSummary::default());
        assert_eq!(s.revisions(), before);
    }
}
