//! Capture-file replay.
//!
//! A capture is the same concatenated MessagePack stream the live socket
//! delivers, saved whole. It is applied through the normal ingest path after
//! a reset and a short settle delay.

use std::path::Path;
use std::time::Duration;

use pipetrace_core::error::InspectorError;
use pipetrace_data::decoder::Encoding;
use tokio::sync::mpsc;
use tracing::info;

use crate::transport::{Envelope, TransportEvent};

/// Read `path`, request a session reset, wait `settle`, then deliver the
/// whole blob as one buffer.
///
/// Returns the number of bytes delivered.
pub async fn load(
    path: &Path,
    settle: Duration,
    tx: &mpsc::Sender<Envelope>,
    generation: u64,
) -> Result<usize, InspectorError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| InspectorError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    let len = bytes.len();

    let send = |event: TransportEvent| async move {
        tx.send(Envelope { generation, event })
            .await
            .map_err(|_| InspectorError::Transport("event channel closed".to_string()))
    };

    send(TransportEvent::ResetRequested).await?;
    tokio::time::sleep(settle).await;
    send(TransportEvent::Buffer {
        bytes,
        encoding: Encoding::MsgPack,
    })
    .await?;

    info!(path = %path.display(), bytes = len, "replay delivered");
    Ok(len)
}
