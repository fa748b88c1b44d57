//! View projector: derived, read-only views over the session's frame logs.
//!
//! Nothing here mutates the [`Session`]. Results are ordered ascending by
//! `(timestamp, seq)` so equal producer timestamps keep arrival order and
//! repeated projections of the same state come out identical.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use pipetrace_core::models::{Direction, Frame, FrameEvent};
use regex::Regex;

use crate::session::{FrameRef, Session};

fn instance_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"#\d+$").expect("regex is valid"))
}

/// Frame name with its instance suffix (`#3`) stripped.
///
/// A name that is nothing but a suffix is returned unchanged.
pub fn base_name(name: &str) -> &str {
    match instance_suffix().find(name) {
        Some(m) if m.start() > 0 => &name[..m.start()],
        _ => name,
    }
}

fn sort_key(frame: &FrameRef) -> (u64, u64) {
    (frame.timestamp, frame.seq)
}

// ── Criteria ──────────────────────────────────────────────────────────────────

/// Filter applied to frame logs.
///
/// `types` holds base names; an empty set matches every type. The four flags
/// toggle event kinds and directions independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameCriteria {
    pub types: BTreeSet<String>,
    pub push: bool,
    pub process: bool,
    pub upstream: bool,
    pub downstream: bool,
}

impl Default for FrameCriteria {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            push: true,
            process: true,
            upstream: true,
            downstream: true,
        }
    }
}

impl FrameCriteria {
    /// Match-all criteria.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add `base` to the type set, or remove it if already present.
    pub fn toggle_type(&mut self, base: &str) {
        if !self.types.remove(base) {
            self.types.insert(base.to_string());
        }
    }

    /// Add every given type to the set.
    pub fn select_all<'a, I>(&mut self, types: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.types.extend(types.into_iter().map(str::to_string));
    }

    pub fn clear_types(&mut self) {
        self.types.clear();
    }

    pub fn toggle_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::Push => self.push = !self.push,
            FrameEvent::Process => self.process = !self.process,
        }
    }

    pub fn toggle_direction(&mut self, direction: Direction) {
        match direction {
            Direction::Upstream => self.upstream = !self.upstream,
            Direction::Downstream => self.downstream = !self.downstream,
        }
    }

    pub fn event_enabled(&self, event: FrameEvent) -> bool {
        match event {
            FrameEvent::Push => self.push,
            FrameEvent::Process => self.process,
        }
    }

    pub fn direction_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Upstream => self.upstream,
            Direction::Downstream => self.downstream,
        }
    }

    /// Event and direction toggles only.
    pub fn matches_flow(&self, frame: &Frame) -> bool {
        self.event_enabled(frame.event) && self.direction_enabled(frame.direction)
    }

    /// Type set plus event and direction toggles.
    pub fn matches(&self, frame: &Frame) -> bool {
        (self.types.is_empty() || self.types.contains(base_name(&frame.name)))
            && self.matches_flow(frame)
    }

    /// True when these criteria let every frame through.
    pub fn is_match_all(&self) -> bool {
        *self == Self::all()
    }
}

// ── Projections ───────────────────────────────────────────────────────────────

/// Sorted, deduplicated base names across every processor's log.
pub fn available_types(session: &Session) -> Vec<String> {
    let names: BTreeSet<&str> = session
        .logs()
        .flat_map(|(_, log)| log.iter().map(|f| base_name(&f.name)))
        .collect();
    names.into_iter().map(str::to_string).collect()
}

/// Narrow a type vocabulary by case-insensitive substring.
pub fn search_types<'a>(vocabulary: &'a [String], query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    vocabulary
        .iter()
        .map(String::as_str)
        .filter(|t| needle.is_empty() || t.to_lowercase().contains(&needle))
        .collect()
}

/// Frames of one processor that match `criteria`, oldest first.
pub fn filtered_frames(session: &Session, processor_id: &str, criteria: &FrameCriteria) -> Vec<FrameRef> {
    let Some(log) = session.log(processor_id) else {
        return Vec::new();
    };
    let mut frames: Vec<FrameRef> = log
        .iter()
        .filter(|f| criteria.matches(f))
        .cloned()
        .collect();
    frames.sort_by_key(sort_key);
    frames
}

/// One entry of a frame path timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub processor: String,
    pub frame: FrameRef,
}

/// Every occurrence of the exact frame name `name` across the processors of
/// its path, filtered by event and direction, merged oldest first.
pub fn frame_path_timeline(session: &Session, name: &str, criteria: &FrameCriteria) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = session
        .frame_path(name)
        .iter()
        .filter_map(|id| session.log(id).map(|log| (id, log)))
        .flat_map(|(id, log)| {
            log.iter()
                .filter(|f| f.name == name && criteria.matches_flow(f))
                .map(move |f| TimelineEntry {
                    processor: id.clone(),
                    frame: Arc::clone(f),
                })
        })
        .collect();
    entries.sort_by_key(|e| sort_key(&e.frame));
    entries
}

/// Index of the entry holding the frame recorded with `seq`.
pub fn timeline_position(timeline: &[TimelineEntry], seq: u64) -> Option<usize> {
    timeline.iter().position(|e| e.frame.seq == seq)
}

// ── Memoization ───────────────────────────────────────────────────────────────

/// Memo of projections, valid for one frames revision of one session.
///
/// Any recorded batch or reset bumps the revision, which drops every cached
/// result on the next lookup.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    revision: Option<u64>,
    types: Option<Arc<Vec<String>>>,
    filtered: HashMap<(String, FrameCriteria), Arc<Vec<FrameRef>>>,
    timelines: HashMap<(String, FrameCriteria), Arc<Vec<TimelineEntry>>>,
    computed: u64,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn sync(&mut self, session: &Session) {
        let current = session.revisions().frames;
        if self.revision != Some(current) {
            self.types = None;
            self.filtered.clear();
            self.timelines.clear();
            self.revision = Some(current);
        }
    }

    pub fn available_types(&mut self, session: &Session) -> Arc<Vec<String>> {
        self.sync(session);
        if let Some(types) = &self.types {
            return Arc::clone(types);
        }
        self.computed += 1;
        let types = Arc::new(available_types(session));
        self.types = Some(Arc::clone(&types));
        types
    }

    pub fn filtered_frames(
        &mut self,
        session: &Session,
        processor_id: &str,
        criteria: &FrameCriteria,
    ) -> Arc<Vec<FrameRef>> {
        self.sync(session);
        let key = (processor_id.to_string(), criteria.clone());
        if let Some(hit) = self.filtered.get(&key) {
            return Arc::clone(hit);
        }
        self.computed += 1;
        let frames = Arc::new(filtered_frames(session, processor_id, criteria));
        self.filtered.insert(key, Arc::clone(&frames));
        frames
    }

    pub fn frame_path_timeline(
        &mut self,
        session: &Session,
        name: &str,
        criteria: &FrameCriteria,
    ) -> Arc<Vec<TimelineEntry>> {
        self.sync(session);
        let key = (name.to_string(), criteria.clone());
        if let Some(hit) = self.timelines.get(&key) {
            return Arc::clone(hit);
        }
        self.computed += 1;
        let timeline = Arc::new(frame_path_timeline(session, name, criteria));
        self.timelines.insert(key, Arc::clone(&timeline));
        timeline
    }

    /// Number of projections actually computed (cache misses).
    pub fn computed(&self) -> u64 {
        self.computed
    }
}
