//! Terminal UI layer for the pipeline inspector.
//!
//! Provides themes, the header and indicator components, the topology,
//! frame and path panels, and the main application event loop built on top
//! of [`ratatui`].

pub mod app;
pub mod components;
pub mod frames_view;
pub mod path_view;
pub mod themes;
pub mod topology_view;

pub use pipetrace_core as core;
