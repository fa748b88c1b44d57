//! Trace ingestion and indexing for the pipeline inspector.
//!
//! Decodes protocol buffers into typed records, keeps the authoritative
//! session state (topology, per-processor frame logs, frame path index and
//! selection) and projects filtered views over it.

pub mod decoder;
pub mod ingest;
pub mod selection;
pub mod session;
pub mod topology;
pub mod view;

pub use pipetrace_core as core;

pub use decoder::{Encoding, Record};
pub use ingest::{ingest, IngestSummary};
pub use selection::{FocusState, PathStep, Selection, SelectionCoordinator};
pub use session::{FrameRef, RecordedFrame, Revisions, Session};
pub use topology::Topology;
pub use view::{FrameCriteria, ProjectionCache, TimelineEntry};
