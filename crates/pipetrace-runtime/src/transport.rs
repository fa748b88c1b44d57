//! Buffer transports.
//!
//! A [`Transport`] owns at most one background source at a time: a live
//! WebSocket connection or a capture-file replay. Sources run in tokio tasks
//! and deliver [`Envelope`]s through an `mpsc` channel so the UI loop can
//! apply them to the session without any shared mutable state.
//!
//! Every source is tagged with a connection generation. Starting a source or
//! disconnecting bumps the generation, and consumers drop envelopes whose
//! generation is not current, so at most one source ever mutates the store.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use pipetrace_data::decoder::Encoding;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::replay;

/// Channel capacity between a source task and the consumer.
const CHANNEL_CAPACITY: usize = 256;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket handshake completed.
    Connected,
    /// One whole message, to be decoded and applied as a unit.
    Buffer { bytes: Vec<u8>, encoding: Encoding },
    /// The source ended. `reason` is set when it ended on an error.
    Disconnected { reason: Option<String> },
    /// A replay is about to start; the consumer should reset its session.
    ResetRequested,
    /// A replay could not be loaded.
    Failed(String),
}

/// A [`TransportEvent`] tagged with the generation of the source that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub generation: u64,
    pub event: TransportEvent,
}

// ── Transport ─────────────────────────────────────────────────────────────────

pub struct Transport {
    tx: mpsc::Sender<Envelope>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Transport {
    /// Create a transport and the receiving end of its event channel.
    pub fn new() -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let transport = Self {
            tx,
            generation: 0,
            task: None,
        };
        (transport, rx)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `envelope` comes from the source currently owned by this transport.
    pub fn is_current(&self, envelope: &Envelope) -> bool {
        envelope.generation == self.generation
    }

    /// Whether a source task is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Open a WebSocket connection to `url`, tearing down any live source
    /// first. Must be called from within a tokio runtime.
    ///
    /// Returns the generation of the new connection.
    pub fn connect(&mut self, url: &Url) -> u64 {
        self.stop_task();
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        let url = url.clone();

        info!(%url, generation, "connecting");
        self.task = Some(tokio::spawn(async move {
            run_socket(url, generation, tx).await;
        }));
        generation
    }

    /// Replay a capture file, tearing down any live source first.
    ///
    /// Emits `ResetRequested`, waits `settle`, then delivers the whole file
    /// as one MessagePack buffer.
    pub fn replay(&mut self, path: PathBuf, settle: Duration) -> u64 {
        self.stop_task();
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();

        info!(path = %path.display(), generation, "starting replay");
        self.task = Some(tokio::spawn(async move {
            if let Err(e) = replay::load(&path, settle, &tx, generation).await {
                warn!(error = %e, "replay failed");
                let _ = tx
                    .send(Envelope {
                        generation,
                        event: TransportEvent::Failed(e.to_string()),
                    })
                    .await;
            }
        }));
        generation
    }

    /// Stop the current source. Anything it already queued becomes stale.
    pub fn disconnect(&mut self) {
        let was_active = self.task.is_some();
        self.stop_task();
        self.generation += 1;

        if was_active {
            let envelope = Envelope {
                generation: self.generation,
                event: TransportEvent::Disconnected { reason: None },
            };
            if let Err(e) = self.tx.try_send(envelope) {
                debug!(error = %e, "could not queue disconnect notice");
            }
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop_task();
    }
}

// ── Socket task ───────────────────────────────────────────────────────────────

async fn run_socket(url: Url, generation: u64, tx: mpsc::Sender<Envelope>) {
    let send = |event: TransportEvent| {
        let tx = tx.clone();
        async move { tx.send(Envelope { generation, event }).await.is_ok() }
    };

    let mut stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(%url, error = %e, "connection failed");
            send(TransportEvent::Disconnected {
                reason: Some(e.to_string()),
            })
            .await;
            return;
        }
    };

    info!(%url, "connected");
    if !send(TransportEvent::Connected).await {
        return;
    }

    let mut reason = None;
    while let Some(message) = stream.next().await {
        let event = match message {
            Ok(Message::Binary(bytes)) => TransportEvent::Buffer {
                bytes,
                encoding: Encoding::MsgPack,
            },
            Ok(Message::Text(text)) => TransportEvent::Buffer {
                bytes: text.into_bytes(),
                encoding: Encoding::JsonLines,
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "server closed the connection");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "socket error");
                reason = Some(e.to_string());
                break;
            }
        };

        if !send(event).await {
            debug!("transport channel closed; exiting socket task");
            return;
        }
    }

    info!(%url, "disconnected");
    send(TransportEvent::Disconnected { reason }).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
