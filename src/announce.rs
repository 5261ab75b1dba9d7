//! Voice announcement sink.
//!
//! Announcements are fire-and-forget: the engine hands text to an
//! [`AnnouncementVoice`] capability and moves on. The capability may be
//! entirely absent (see [`NullVoice`]); failures are logged and swallowed.
//! At most one utterance is in flight; starting a new one cancels the
//! previous. The busy state is published over a `watch` channel so the
//! engine can mirror it into the session's speaking flag.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// External text-to-speech capability.
#[async_trait]
pub trait AnnouncementVoice: Send + Sync {
    /// Vocalize the given text, returning when playback finishes.
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Voice for environments without a speech capability. Every request is a
/// silent no-op.
#[derive(Debug, Default)]
pub struct NullVoice;

#[async_trait]
impl AnnouncementVoice for NullVoice {
    async fn speak(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Fire-and-forget announcer wrapping a voice capability.
pub struct Announcer {
    voice: Arc<dyn AnnouncementVoice>,
    busy_tx: watch::Sender<bool>,
    // Held so `busy_tx.send` succeeds even before anyone subscribes.
    _busy_rx: watch::Receiver<bool>,
    inflight: Mutex<Option<CancellationToken>>,
}

impl Announcer {
    /// Wrap a voice capability.
    pub fn new(voice: Arc<dyn AnnouncementVoice>) -> Self {
        let (busy_tx, _busy_rx) = watch::channel(false);
        Self {
            voice,
            busy_tx,
            _busy_rx,
            inflight: Mutex::new(None),
        }
    }

    /// Subscribe to busy-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    /// Whether an utterance is currently in flight.
    pub fn is_busy(&self) -> bool {
        *self.busy_tx.borrow()
    }

    /// Start vocalizing `text`, cancelling any in-flight utterance first.
    /// Returns immediately.
    pub fn say(&self, text: String) {
        let token = CancellationToken::new();
        if let Ok(mut guard) = self.inflight.lock() {
            if let Some(prev) = guard.take() {
                prev.cancel();
            }
            *guard = Some(token.clone());
        }
        let _ = self.busy_tx.send(true);

        let voice = Arc::clone(&self.voice);
        let busy = self.busy_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("announcement cancelled");
                }
                res = voice.speak(&text) => {
                    if let Err(e) = res {
                        warn!(error = %e, "announcement failed");
                    }
                }
            }
            // A cancelled token means a newer utterance owns the busy flag.
            if !token.is_cancelled() {
                let _ = busy.send(false);
            }
        });
    }

    /// Cancel any in-flight utterance and clear the busy flag.
    pub fn cancel(&self) {
        if let Ok(mut guard) = self.inflight.lock() {
            if let Some(prev) = guard.take() {
                prev.cancel();
            }
        }
        let _ = self.busy_tx.send(false);
    }
}
