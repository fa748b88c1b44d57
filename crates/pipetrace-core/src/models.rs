use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque frame payload, carried verbatim from the wire for display only.
pub type Payload = rmpv::Value;

/// A node in the pipeline topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processor {
    /// Identity, unique within one topology snapshot.
    pub id: String,
    /// Display label (not guaranteed unique).
    pub name: String,
    /// Id of the containing processor, if this one is nested.
    #[serde(default)]
    pub parent: Option<String>,
    /// Category tag.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A directed edge between two processors of the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

/// Informational version strings attached to a topology snapshot.
///
/// Older producers use `python` / `pipecat` / `whisker` for the runtime,
/// framework and tool fields; both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default, alias = "python")]
    pub runtime: Option<String>,
    #[serde(default, alias = "pipecat")]
    pub framework: Option<String>,
    #[serde(default, alias = "whisker")]
    pub tool: Option<String>,
}

impl Versions {
    /// `"key: value"` pairs for the fields that are present, in a stable order.
    pub fn labelled(&self) -> Vec<(&'static str, &str)> {
        [
            ("tool", self.tool.as_deref()),
            ("framework", self.framework.as_deref()),
            ("runtime", self.runtime.as_deref()),
            ("platform", self.platform.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
    }
}

/// The atomic, replaceable description of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub processors: Vec<Processor>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub versions: Option<Versions>,
}

/// Whether the processor forwarded the frame or transformed it internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEvent {
    Push,
    Process,
}

/// Flow direction of a frame through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upstream,
    Downstream,
}

/// Highlighting class carried by the record discriminator.
///
/// `frame` is [`FrameKind::Standard`]; `frame:whisker` and
/// `frame:whisker-urgent` mark frames the producer asked to be called out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    #[default]
    Standard,
    Highlighted,
    Urgent,
}

impl FrameKind {
    /// Map a frame discriminator (`frame`, `frame:<suffix>`) to its kind.
    /// Returns `None` when the discriminator does not denote a frame at all.
    pub fn from_discriminator(tag: &str) -> Option<Self> {
        match tag {
            "frame" => Some(Self::Standard),
            "frame:whisker" => Some(Self::Highlighted),
            "frame:whisker-urgent" => Some(Self::Urgent),
            other if other.starts_with("frame:") => Some(Self::Standard),
            _ => None,
        }
    }
}

/// One observed event of a frame flowing through a processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Counter unique within the session.
    pub id: u64,
    /// Logical type name, possibly carrying an instance suffix such as `#3`.
    pub name: String,
    /// Originating processor id.
    pub from: String,
    pub event: FrameEvent,
    pub direction: Direction,
    /// Epoch milliseconds, producer clock.
    #[serde(deserialize_with = "epoch_ms")]
    pub timestamp: u64,
    #[serde(default = "nil_payload")]
    pub payload: Payload,
    #[serde(skip)]
    pub kind: FrameKind,
}

fn nil_payload() -> Payload {
    Payload::Nil
}

/// Producers on some runtimes emit fractional milliseconds; truncate them.
fn epoch_ms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Unsigned(v) => Ok(v),
        Raw::Signed(v) => u64::try_from(v).map_err(|_| D::Error::custom("negative timestamp")),
        Raw::Float(v) if v.is_finite() && v >= 0.0 => Ok(v as u64),
        Raw::Float(v) => Err(D::Error::custom(format!("invalid timestamp {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind_from_discriminator() {
        assert_eq!(FrameKind::from_discriminator("frame"), Some(FrameKind::Standard));
        assert_eq!(
            FrameKind::from_discriminator("frame:whisker"),
            Some(FrameKind::Highlighted)
        );
        assert_eq!(
            FrameKind::from_discriminator("frame:whisker-urgent"),
            Some(FrameKind::Urgent)
        );
        assert_eq!(
            FrameKind::from_discriminator("frame:custom"),
            Some(FrameKind::Standard)
        );
        assert_eq!(FrameKind::from_discriminator("pipeline"), None);
        assert_eq!(FrameKind::from_discriminator("frames"), None);
    }

    #[test]
    fn test_processor_deserializes_type_and_null_parent() {
        let json = r#"{"id":"p1","name":"STT","parent":null,"type":"service"}"#;
        let p: Processor = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "p1");
        assert_eq!(p.kind, "service");
        assert!(p.parent.is_none());
    }

    #[test]
    fn test_versions_accept_legacy_keys() {
        let json = r#"{"platform":"linux","python":"3.12","pipecat":"0.0.80","whisker":"0.1"}"#;
        let v: Versions = serde_json::from_str(json).unwrap();
        assert_eq!(v.runtime.as_deref(), Some("3.12"));
        assert_eq!(v.framework.as_deref(), Some("0.0.80"));
        assert_eq!(v.tool.as_deref(), Some("0.1"));

        let labels = v.labelled();
        assert_eq!(labels[0], ("tool", "0.1"));
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_frame_enums_lowercase() {
        let json = r#"{"id":7,"name":"TextFrame#1","from":"a","event":"push","direction":"upstream","timestamp":100}"#;
        let f: Frame = serde_json::from_str(json).unwrap();
        assert_eq!(f.event, FrameEvent::Push);
        assert_eq!(f.direction, Direction::Upstream);
        assert_eq!(f.payload, Payload::Nil);
        assert_eq!(f.kind, FrameKind::Standard);
    }

    #[test]
    fn test_frame_timestamp_accepts_float_and_rejects_negative() {
        let json = r#"{"id":1,"name":"A","from":"a","event":"process","direction":"downstream","timestamp":1500.75}"#;
        let f: Frame = serde_json::from_str(json).unwrap();
        assert_eq!(f.timestamp, 1500);

        let json = r#"{"id":1,"name":"A","from":"a","event":"process","direction":"downstream","timestamp":-4}"#;
        assert!(serde_json::from_str::<Frame>(json).is_err());
    }
}
