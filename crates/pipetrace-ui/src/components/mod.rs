//! Small reusable line builders shared by the panels.

pub mod header;
pub mod indicators;
