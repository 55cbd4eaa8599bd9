//! Playback items
//!
//! A [`PlaybackItem`] is one prepared, observable unit of playable content,
//! built only from an asset whose playability has been confirmed. It owns a
//! readiness-status stream and a one-shot natural-end signal, each delivered
//! on a per-item channel so the receiver never has to filter by identity.

use crate::{
    asset::AssetHandle,
    types::{ItemId, ItemStatus, MediaSource},
    Error, Result,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// An event observed on a playback item
#[derive(Debug, Clone)]
pub enum ItemEvent {
    /// Readiness status at subscribe time, then one per transition
    Status(ItemStatus),
    /// Playback of the underlying content reached its natural end
    ReachedEnd,
}

enum SubscriptionSlot {
    Available {
        status: watch::Receiver<ItemStatus>,
        ended: mpsc::UnboundedReceiver<()>,
    },
    Active,
    Released,
}

struct ItemInner {
    id: ItemId,
    source: MediaSource,
    status_tx: watch::Sender<ItemStatus>,
    ended_tx: mpsc::UnboundedSender<()>,
    slot: Mutex<SubscriptionSlot>,
    last_error: Mutex<Option<Arc<Error>>>,
    ended: std::sync::atomic::AtomicBool,
}

/// One prepared, observable unit of playable content.
///
/// Cheap to clone; all clones refer to the same item.
#[derive(Clone)]
pub struct PlaybackItem {
    inner: Arc<ItemInner>,
}

impl PlaybackItem {
    /// Build an item from a resolved, playable asset.
    ///
    /// Fails with [`Error::PrematureQuery`] if the asset has not finished
    /// resolving, or [`Error::NotPlayable`] if it did and is not playable.
    pub fn from_asset(asset: &AssetHandle) -> Result<Self> {
        if !asset.is_playable()? {
            return Err(Error::NotPlayable {
                locator: asset.source().to_string(),
            });
        }
        Ok(Self::with_source(asset.source().clone()))
    }

    pub(crate) fn with_source(source: MediaSource) -> Self {
        let (status_tx, status_rx) = watch::channel(ItemStatus::Unknown);
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(ItemInner {
                id: ItemId::new(),
                source,
                status_tx,
                ended_tx,
                slot: Mutex::new(SubscriptionSlot::Available {
                    status: status_rx,
                    ended: ended_rx,
                }),
                last_error: Mutex::new(None),
                ended: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> ItemId {
        self.inner.id
    }

    pub fn source(&self) -> &MediaSource {
        &self.inner.source
    }

    /// Current readiness status
    pub fn status(&self) -> ItemStatus {
        *self.inner.status_tx.borrow()
    }

    /// Error payload of the terminal `Failed` status, if any
    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.inner.last_error.lock().expect("error lock poisoned").clone()
    }

    /// Take the item's single status/end subscription.
    ///
    /// Exactly one subscription may ever be active; re-subscribing after a
    /// release is refused.
    pub fn subscribe(&self) -> Result<ItemSubscription> {
        let mut slot = self.inner.slot.lock().expect("slot lock poisoned");
        match std::mem::replace(&mut *slot, SubscriptionSlot::Active) {
            SubscriptionSlot::Available { status, ended } => Ok(ItemSubscription {
                item: self.inner.id,
                status,
                ended,
                delivered_initial: false,
            }),
            SubscriptionSlot::Active => Err(Error::AlreadySubscribed),
            SubscriptionSlot::Released => {
                *slot = SubscriptionSlot::Released;
                Err(Error::SubscriptionReplayed)
            }
        }
    }

    /// Release the subscription token. Must happen before the item is
    /// discarded so no event of the old item can be misattributed.
    pub fn release_subscription(&self, subscription: ItemSubscription) {
        if subscription.item != self.inner.id {
            warn!(item = %self.inner.id, token = %subscription.item, "subscription released against wrong item");
            return;
        }
        let mut slot = self.inner.slot.lock().expect("slot lock poisoned");
        *slot = SubscriptionSlot::Released;
        debug!(item = %self.inner.id, "item subscription released");
    }

    /// Mark the item ready to play. Ignored once the status left `Unknown`;
    /// readiness is monotonic and never reset in place.
    pub fn mark_ready(&self) {
        let changed = self.inner.status_tx.send_if_modified(|status| {
            if *status == ItemStatus::Unknown {
                *status = ItemStatus::Ready;
                true
            } else {
                false
            }
        });
        if changed {
            debug!(item = %self.inner.id, "item ready");
        } else {
            warn!(item = %self.inner.id, status = %self.status(), "mark_ready ignored");
        }
    }

    /// Move the item to terminal `Failed` with an error payload
    pub fn fail(&self, error: Error) {
        {
            let mut last_error = self.inner.last_error.lock().expect("error lock poisoned");
            if self.status() == ItemStatus::Failed {
                return;
            }
            warn!(item = %self.inner.id, %error, "item failed");
            *last_error = Some(Arc::new(error));
        }
        self.inner.status_tx.send_if_modified(|status| {
            if *status == ItemStatus::Failed {
                false
            } else {
                *status = ItemStatus::Failed;
                true
            }
        });
    }

    /// Fire the one-shot natural-end signal. Repeat calls are ignored; the
    /// signal is independent of the status stream.
    pub fn signal_ended(&self) {
        if self.inner.ended.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        debug!(item = %self.inner.id, "item reached natural end");
        let _ = self.inner.ended_tx.send(());
    }
}

impl std::fmt::Debug for PlaybackItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackItem")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("status", &self.status())
            .finish()
    }
}

/// Disposable subscription token for one item's status stream and end
/// signal. Hand it back via [`PlaybackItem::release_subscription`] before
/// discarding the item.
pub struct ItemSubscription {
    item: ItemId,
    status: watch::Receiver<ItemStatus>,
    ended: mpsc::UnboundedReceiver<()>,
    delivered_initial: bool,
}

impl ItemSubscription {
    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn current_status(&self) -> ItemStatus {
        *self.status.borrow()
    }

    /// Next observed event.
    ///
    /// The first call delivers a synthetic event reflecting the status at
    /// subscribe time; afterwards, one event per status transition plus the
    /// one-shot end signal. Returns `None` once the item is gone.
    pub async fn next_event(&mut self) -> Option<ItemEvent> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(ItemEvent::Status(*self.status.borrow_and_update()));
        }

        tokio::select! {
            changed = self.status.changed() => match changed {
                Ok(()) => Some(ItemEvent::Status(*self.status.borrow_and_update())),
                Err(_) => None,
            },
            ended = self.ended.recv() => ended.map(|_| ItemEvent::ReachedEnd),
        }
    }

    /// Non-blocking variant of [`next_event`](Self::next_event) for drivers
    /// polling between ticks
    pub fn try_next_event(&mut self) -> Option<ItemEvent> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(ItemEvent::Status(*self.status.borrow_and_update()));
        }
        if self.status.has_changed().unwrap_or(false) {
            return Some(ItemEvent::Status(*self.status.borrow_and_update()));
        }
        self.ended.try_recv().ok().map(|_| ItemEvent::ReachedEnd)
    }
}

impl std::fmt::Debug for ItemSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSubscription")
            .field("item", &self.item)
            .finish_non_exhaustive()
    }
}
