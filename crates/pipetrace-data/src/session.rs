//! Session store: the authoritative state of one inspected pipeline run.
//!
//! Holds the topology arena, one frame log per processor id, the frame path
//! index and the selection. Between two resets the store only grows: the
//! only ways history shrinks are [`Session::reset_session`] and
//! [`Session::apply_topology`].

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::Arc;

use pipetrace_core::models::{Frame, Processor, TopologySnapshot};
use tracing::{debug, info};

use crate::selection::Selection;
use crate::topology::Topology;

/// A frame as recorded by the store, stamped with its arrival sequence.
///
/// `seq` is unique within a session and increases in application order; it
/// identifies a log entry and breaks timestamp ties deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub seq: u64,
    pub frame: Frame,
}

impl Deref for RecordedFrame {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

/// Shared handle to a recorded frame. Views and the selection hold these
/// instead of copying payloads.
pub type FrameRef = Arc<RecordedFrame>;

/// Change counters, bumped on every mutation of the corresponding slice.
///
/// Counters never go backwards, not even across resets, so they can key
/// memoized projections safely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Revisions {
    pub topology: u64,
    pub frames: u64,
    pub selection: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    topology: Topology,
    /// Newest entry first.
    logs: HashMap<String, VecDeque<FrameRef>>,
    /// Log buckets for ids the topology does not know, in first-seen order.
    unlabeled: Vec<String>,
    frame_paths: HashMap<String, Vec<String>>,
    pub(crate) selection: Selection,
    next_seq: u64,
    revisions: Revisions,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Drop topology, frame logs, path index and selection. Idempotent.
    pub fn reset_session(&mut self) {
        self.topology = Topology::default();
        self.logs.clear();
        self.unlabeled.clear();
        self.frame_paths.clear();
        self.selection.reset();
        self.next_seq = 0;

        self.revisions.topology += 1;
        self.revisions.frames += 1;
        self.revisions.selection += 1;
        debug!("session reset");
    }

    /// Replace the topology. Everything recorded against the previous one is
    /// discarded first, since processor ids only mean something within one
    /// snapshot.
    pub fn apply_topology(&mut self, snapshot: TopologySnapshot) {
        self.reset_session();
        self.topology = Topology::from_snapshot(snapshot);
        self.revisions.topology += 1;
        info!(
            processors = self.topology.processors().len(),
            connections = self.topology.connections().len(),
            "topology applied"
        );
    }

    /// Record a batch of frames in arrival order.
    ///
    /// Each frame goes to the front of its originating processor's log, and
    /// the originating processor is appended to the path of the frame's exact
    /// name unless it is already there.
    pub fn record_frames<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut recorded = 0usize;

        for frame in batch {
            let entry = Arc::new(RecordedFrame {
                seq: self.next_seq,
                frame,
            });
            self.next_seq += 1;

            let from = entry.from.clone();
            if !self.logs.contains_key(&from) && !self.topology.contains(&from) {
                debug!(processor = %from, "frame from processor outside the topology");
                self.unlabeled.push(from.clone());
            }

            let path = self.frame_paths.entry(entry.name.clone()).or_default();
            if !path.iter().any(|id| *id == from) {
                path.push(from.clone());
            }

            self.logs.entry(from).or_default().push_front(entry);
            recorded += 1;
        }

        if recorded > 0 {
            self.revisions.frames += 1;
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn processor(&self, id: &str) -> Option<&Processor> {
        self.topology.processor(id)
    }

    /// The frame log of `processor_id`, newest first.
    pub fn log(&self, processor_id: &str) -> Option<&VecDeque<FrameRef>> {
        self.logs.get(processor_id)
    }

    pub fn log_len(&self, processor_id: &str) -> usize {
        self.logs.get(processor_id).map_or(0, VecDeque::len)
    }

    /// All frame logs, keyed by processor id, in no particular order.
    pub fn logs(&self) -> impl Iterator<Item = (&str, &VecDeque<FrameRef>)> {
        self.logs.iter().map(|(id, log)| (id.as_str(), log))
    }

    pub fn total_frames(&self) -> usize {
        self.logs.values().map(VecDeque::len).sum()
    }

    /// Ids with a frame log that are not part of the topology, first-seen order.
    pub fn unlabeled_processors(&self) -> &[String] {
        &self.unlabeled
    }

    /// Every processor id an operator can focus: the topology's processors in
    /// snapshot order, then unlabeled log buckets.
    pub fn processor_ids(&self) -> Vec<&str> {
        self.topology
            .processors()
            .iter()
            .map(|p| p.id.as_str())
            .chain(self.unlabeled.iter().map(String::as_str))
            .collect()
    }

    /// Whether `id` names a topology processor or an existing log bucket.
    pub fn knows_processor(&self, id: &str) -> bool {
        self.topology.contains(id) || self.logs.contains_key(id)
    }

    /// Processor ids that emitted a frame named exactly `name`, in
    /// first-discovery order.
    pub fn frame_path(&self, name: &str) -> &[String] {
        self.frame_paths.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn frame_path_names(&self) -> impl Iterator<Item = &str> {
        self.frame_paths.keys().map(String::as_str)
    }

    /// Look up a recorded frame by processor and frame id.
    pub fn find_frame(&self, processor_id: &str, frame_id: u64) -> Option<&FrameRef> {
        self.logs
            .get(processor_id)
            .and_then(|log| log.iter().find(|f| f.id == frame_id))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub(crate) fn bump_selection(&mut self) {
        self.revisions.selection += 1;
    }
}
