//! Selection coordinator.
//!
//! Keeps the topology, frame inspector and frame path panels consistent.
//! The coordinator is the only code that writes [`Selection`]; the session
//! itself only ever resets it.

use std::sync::Arc;

use tracing::debug;

use crate::session::{FrameRef, Session};
use crate::view::{self, FrameCriteria, TimelineEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    Idle,
    ProcessorFocused,
    FrameFocused,
    PathFocused,
}

/// Direction of movement along the frame path timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    Next,
    Previous,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub(crate) state: FocusState,
    pub(crate) processor: Option<String>,
    pub(crate) frame: Option<FrameRef>,
    /// The entry currently focused in the path timeline.
    pub(crate) frame_path: Option<FrameRef>,
}

impl Selection {
    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn processor(&self) -> Option<&str> {
        self.processor.as_deref()
    }

    pub fn frame(&self) -> Option<&FrameRef> {
        self.frame.as_ref()
    }

    pub fn frame_path(&self) -> Option<&FrameRef> {
        self.frame_path.as_ref()
    }

    /// Exact name of the frame the path panel is centred on.
    pub fn path_name(&self) -> Option<&str> {
        self.frame_path.as_ref().map(|f| f.name.as_str())
    }

    pub fn is_frame_selected(&self, frame: &FrameRef) -> bool {
        self.frame.as_ref().is_some_and(|f| f.seq == frame.seq)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct SelectionCoordinator<'a> {
    session: &'a mut Session,
}

impl Session {
    /// Borrow the session for selection changes.
    pub fn selection_coordinator(&mut self) -> SelectionCoordinator<'_> {
        SelectionCoordinator { session: self }
    }
}

impl SelectionCoordinator<'_> {
    fn commit(&mut self, next: Selection) -> FocusState {
        let state = next.state;
        self.session.selection = next;
        self.session.bump_selection();
        state
    }

    /// Focus a processor, dropping frame and path focus.
    ///
    /// Ids that are neither in the topology nor an existing log bucket are
    /// ignored.
    pub fn select_processor(&mut self, id: &str) -> FocusState {
        if !self.session.knows_processor(id) {
            debug!(processor = %id, "ignoring selection of unknown processor");
            return self.session.selection.state;
        }
        self.commit(Selection {
            state: FocusState::ProcessorFocused,
            processor: Some(id.to_string()),
            frame: None,
            frame_path: None,
        })
    }

    /// Drop every selection.
    pub fn clear(&mut self) -> FocusState {
        self.commit(Selection::default())
    }

    /// Select a frame row, or deselect it if it is already selected.
    ///
    /// Selecting also centres the path timeline on the frame. Deselecting
    /// returns to processor focus.
    pub fn toggle_frame(&mut self, frame: &FrameRef) -> FocusState {
        let current = &self.session.selection;
        if current.is_frame_selected(frame) {
            let processor = current.processor.clone().or_else(|| Some(frame.from.clone()));
            return self.commit(Selection {
                state: FocusState::ProcessorFocused,
                processor,
                frame: None,
                frame_path: None,
            });
        }

        self.commit(Selection {
            state: FocusState::FrameFocused,
            processor: Some(frame.from.clone()),
            frame: Some(Arc::clone(frame)),
            frame_path: Some(Arc::clone(frame)),
        })
    }

    /// Focus the entry at `index` of the current path timeline.
    ///
    /// Returns `false` when nothing is path-focusable or `index` is out of
    /// range.
    pub fn focus_path_entry(&mut self, criteria: &FrameCriteria, index: usize) -> bool {
        let Some(name) = self.session.selection.path_name().map(str::to_string) else {
            return false;
        };
        let timeline = view::frame_path_timeline(self.session, &name, criteria);
        match timeline.into_iter().nth(index) {
            Some(entry) => {
                self.focus_entry(entry);
                true
            }
            None => false,
        }
    }

    /// Move path focus to the adjacent timeline entry.
    ///
    /// When the focused frame has been filtered out of the timeline, the
    /// nearest entry in the requested direction is used. Returns `false` at
    /// either end of the timeline.
    pub fn navigate(&mut self, criteria: &FrameCriteria, step: PathStep) -> bool {
        let Some(current) = self.session.selection.frame_path.clone() else {
            return false;
        };
        let timeline = view::frame_path_timeline(self.session, &current.name, criteria);
        let key = (current.timestamp, current.seq);

        let target = match view::timeline_position(&timeline, current.seq) {
            Some(pos) => match step {
                PathStep::Next => pos.checked_add(1).filter(|&i| i < timeline.len()),
                PathStep::Previous => pos.checked_sub(1),
            },
            None => match step {
                PathStep::Next => timeline
                    .iter()
                    .position(|e| (e.frame.timestamp, e.frame.seq) > key),
                PathStep::Previous => timeline
                    .iter()
                    .rposition(|e| (e.frame.timestamp, e.frame.seq) < key),
            },
        };

        match target.and_then(|i| timeline.into_iter().nth(i)) {
            Some(entry) => {
                self.focus_entry(entry);
                true
            }
            None => false,
        }
    }

    fn focus_entry(&mut self, entry: TimelineEntry) {
        debug!(processor = %entry.processor, frame = entry.frame.id, "path focus moved");
        self.commit(Selection {
            state: FocusState::PathFocused,
            processor: Some(entry.processor),
            frame: Some(Arc::clone(&entry.frame)),
            frame_path: Some(entry.frame),
        });
    }
}
