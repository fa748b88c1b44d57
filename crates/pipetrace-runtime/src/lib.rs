//! Transports for the pipeline inspector.
//!
//! Delivers whole protocol buffers from a live WebSocket or a capture file
//! to the UI loop over a channel.

pub mod replay;
pub mod transport;

pub use pipetrace_core as core;
pub use pipetrace_data as data;

pub use transport::{Envelope, Transport, TransportEvent};
