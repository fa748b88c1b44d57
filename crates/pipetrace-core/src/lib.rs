//! Shared data model, error taxonomy, settings and display helpers for the
//! pipeline inspector.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{DecodeError, InspectorError, Result};
