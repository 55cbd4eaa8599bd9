//! Playback engine
//!
//! Holds at most one current [`PlaybackItem`], drives play/pause/rate, and
//! reports status changes over a typed event channel. Replacement of the
//! current item is atomic from the observer's point of view: there is never
//! an observable intermediate state without a current item, and the change
//! is reported by event, not discovered by polling.

use crate::{item::PlaybackItem, types::ItemId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Status change events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The current item was set, replaced, or cleared
    CurrentItemChanged(Option<ItemId>),
    /// Playback rate changed; 0 means paused
    RateChanged(f64),
}

/// Receiver half of the engine's event channel, created with the engine
pub struct EngineSubscription {
    events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineSubscription {
    /// Next engine event; `None` once the engine is gone
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant for drivers polling between ticks
    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        self.events.try_recv().ok()
    }
}

/// The component that holds the current playback item and drives rate.
///
/// Created once per session; the current item is replaced, never the engine
/// itself.
pub struct PlaybackEngine {
    current: Option<PlaybackItem>,
    rate: f64,
    position: f64,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl PlaybackEngine {
    /// Create an engine together with its single event subscription
    pub fn new() -> (Self, EngineSubscription) {
        let (events_tx, events) = mpsc::unbounded_channel();
        (
            Self {
                current: None,
                rate: 0.0,
                position: 0.0,
                events_tx,
            },
            EngineSubscription { events },
        )
    }

    /// Set or replace the current item.
    ///
    /// Replacement happens in one step; observers learn about it through a
    /// [`EngineEvent::CurrentItemChanged`] event. Attaching the item that is
    /// already current is a no-op.
    pub fn attach(&mut self, item: PlaybackItem) {
        if self.current_item_id() == Some(item.id()) {
            return;
        }
        let id = item.id();
        debug!(item = %id, replacing = ?self.current_item_id(), "attaching item");
        self.current = Some(item);
        self.position = 0.0;
        self.emit(EngineEvent::CurrentItemChanged(Some(id)));
    }

    /// Clear the current item and stop playback
    pub fn detach(&mut self) {
        if self.current.take().is_none() {
            return;
        }
        if self.rate != 0.0 {
            self.rate = 0.0;
            self.emit(EngineEvent::RateChanged(0.0));
        }
        self.emit(EngineEvent::CurrentItemChanged(None));
    }

    /// Begin or resume playback. A no-op without a current item: a nonzero
    /// rate always implies an attached item.
    pub fn play(&mut self) {
        if self.current.is_none() {
            debug!("play ignored: no current item");
            return;
        }
        self.rate = 1.0;
        self.emit(EngineEvent::RateChanged(self.rate));
    }

    /// Pause playback. Always safe, idempotent.
    pub fn pause(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.rate = 0.0;
        self.emit(EngineEvent::RateChanged(self.rate));
    }

    /// Externally driven rate change (e.g. a stall or a system interruption).
    /// A nonzero rate without a current item is refused to keep the
    /// rate-implies-item invariant.
    pub fn set_rate(&mut self, rate: f64) {
        if rate != 0.0 && self.current.is_none() {
            warn!(rate, "set_rate ignored: no current item");
            return;
        }
        self.rate = rate;
        self.emit(EngineEvent::RateChanged(rate));
    }

    /// Reset the playback position to the start of the content
    pub fn seek_to_start(&mut self) {
        debug!(from = self.position, "seeking to start");
        self.position = 0.0;
    }

    /// Advance the playhead; called by the playback driver. Returns the new
    /// position in seconds.
    pub fn advance(&mut self, elapsed: Duration) -> f64 {
        self.position += self.rate * elapsed.as_secs_f64();
        self.position
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Playing means the current rate is nonzero. No current item implies
    /// not playing.
    pub fn is_playing(&self) -> bool {
        self.rate != 0.0
    }

    pub fn current_item(&self) -> Option<&PlaybackItem> {
        self.current.as_ref()
    }

    pub fn current_item_id(&self) -> Option<ItemId> {
        self.current.as_ref().map(PlaybackItem::id)
    }

    fn emit(&self, event: EngineEvent) {
        // The subscription may be gone; events are best-effort then.
        let _ = self.events_tx.send(event);
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("current", &self.current_item_id())
            .field("rate", &self.rate)
            .field("position", &self.position)
            .finish()
    }
}
