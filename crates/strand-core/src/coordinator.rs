//! Readiness coordinator - the playback lifecycle state machine
//!
//! Translates asynchronous asset resolution, item readiness, and engine
//! status events into a single authoritative control state. All mutable
//! state is owned by one logical control task: asynchronous completions are
//! re-dispatched onto it as [`CoordinatorEvent`]s and never touch shared
//! state from the execution context they finished on.
//!
//! Stale completions are a first-class concern: a resolution that finishes
//! after its source has been superseded carries the generation it was
//! requested under and is discarded deterministically.

use crate::{
    asset::{AssetHandle, AssetResolver, HttpResolver},
    engine::{EngineEvent, EngineSubscription, PlaybackEngine},
    item::{ItemEvent, ItemSubscription, PlaybackItem},
    loader::ResourceLoaderRegistration,
    pipeline::{HttpPipeline, MediaPipeline},
    surface::{ControlSurface, FailurePresenter, RenderTarget},
    types::{AssetKey, ControlState, ItemId, ItemStatus, MediaSource, PlayStrategy, SourcePhase, VideoGravity},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Coordinator configuration and collaborator wiring
pub struct CoordinatorConfig {
    /// Descriptive keys that must resolve before an item may be built
    pub required_keys: Vec<AssetKey>,
    /// Resolves the required keys for each new source
    pub resolver: Arc<dyn AssetResolver>,
    /// Drives built items to ready/failed
    pub pipeline: Arc<dyn MediaPipeline>,
    /// Interception delegate registered on every asset before resolution
    pub loader: Option<ResourceLoaderRegistration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            required_keys: AssetKey::REQUIRED.to_vec(),
            resolver: Arc::new(HttpResolver::new()),
            pipeline: Arc::new(HttpPipeline::new()),
            loader: None,
        }
    }
}

impl std::fmt::Debug for CoordinatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorConfig")
            .field("required_keys", &self.required_keys)
            .field("loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

/// Events delivered on the coordinator's control task
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// A new media source was selected
    SetSource(MediaSource),
    /// User asked to play
    IssuePlay,
    /// User asked to pause
    IssuePause,
    /// An asset resolution finished; `generation` identifies the source it
    /// was requested for
    ResolutionCompleted {
        generation: u64,
        outcome: Result<()>,
    },
    /// Stop the control loop
    Shutdown,
}

/// Cloneable handle for injecting commands into a running control loop
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub fn set_source(&self, source: MediaSource) -> Result<()> {
        self.send(CoordinatorEvent::SetSource(source))
    }

    pub fn issue_play(&self) -> Result<()> {
        self.send(CoordinatorEvent::IssuePlay)
    }

    pub fn issue_pause(&self) -> Result<()> {
        self.send(CoordinatorEvent::IssuePause)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(CoordinatorEvent::Shutdown)
    }

    fn send(&self, event: CoordinatorEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::ControlLoopClosed)
    }
}

/// The state machine translating resolution and item/engine events into
/// control-surface state.
///
/// Owns the active asset handle and playback item for the duration of one
/// source's lifetime; the engine persists for the whole session.
pub struct ReadinessCoordinator {
    config: CoordinatorConfig,
    surface: Box<dyn ControlSurface>,
    presenter: Box<dyn FailurePresenter>,
    render: Box<dyn RenderTarget>,

    engine: PlaybackEngine,
    engine_events: EngineSubscription,

    events_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    events_rx: mpsc::UnboundedReceiver<CoordinatorEvent>,

    source: Option<MediaSource>,
    generation: u64,
    phase: SourcePhase,
    asset: Option<AssetHandle>,
    item: Option<PlaybackItem>,
    observer: Option<ItemSubscription>,
    strategy: PlayStrategy,
}

impl ReadinessCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        mut surface: Box<dyn ControlSurface>,
        presenter: Box<dyn FailurePresenter>,
        render: Box<dyn RenderTarget>,
    ) -> Self {
        let (engine, engine_events) = PlaybackEngine::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Nothing is playable yet: start disabled with the play affordance.
        surface.set_enabled(false);
        surface.show_play_affordance();

        Self {
            config,
            surface,
            presenter,
            render,
            engine,
            engine_events,
            events_tx,
            events_rx,
            source: None,
            generation: 0,
            phase: SourcePhase::Idle,
            asset: None,
            item: None,
            observer: None,
            strategy: PlayStrategy::Resume,
        }
    }

    /// Handle for injecting commands from other tasks
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Current lifecycle phase of the tracked source
    pub fn phase(&self) -> SourcePhase {
        self.phase
    }

    /// What the next play request will do with the position
    pub fn strategy(&self) -> PlayStrategy {
        self.strategy
    }

    pub fn current_source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    /// The active item, if one has been built for the tracked source
    pub fn item(&self) -> Option<&PlaybackItem> {
        self.item.as_ref()
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Mutable engine access for the playback driver. Only call from the
    /// control task; the engine shares the single-writer model.
    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    /// Derive the externally visible control state from current item
    /// presence, item readiness, and engine rate.
    pub fn control_state(&self) -> ControlState {
        let item_ready = self
            .item
            .as_ref()
            .map(|item| item.status() == ItemStatus::Ready)
            .unwrap_or(false);
        let item_current = self.item.as_ref().map(PlaybackItem::id) == self.engine.current_item_id()
            && self.engine.current_item_id().is_some();

        if !item_ready || !item_current {
            ControlState::Disabled
        } else if self.engine.is_playing() {
            ControlState::ShowPause
        } else {
            ControlState::ShowPlay
        }
    }

    /// Track a new media source.
    ///
    /// Setting the source that is already tracked is a no-op while it is
    /// still being resolved, prepared, or played; once the source has
    /// reached a terminal failure phase, setting it again restarts
    /// resolution from scratch (failures are never retried automatically).
    pub fn set_source(&mut self, source: MediaSource) {
        let terminal = matches!(self.phase, SourcePhase::Unplayable | SourcePhase::Failed);
        if self.source.as_ref() == Some(&source) && !terminal {
            debug!(%source, "source unchanged, ignoring");
            return;
        }

        info!(%source, "tracking new source");
        self.source = Some(source.clone());
        self.generation += 1;
        self.transition(SourcePhase::Resolving);

        let asset = AssetHandle::new(source);
        if let Some(registration) = self.config.loader.clone() {
            // Delegate must be in place before any network activity begins.
            if let Err(error) = asset.set_resource_loader(registration) {
                warn!(%error, "failed to register resource loader");
            }
        }
        self.asset = Some(asset.clone());

        let generation = self.generation;
        let resolver = Arc::clone(&self.config.resolver);
        let keys = self.config.required_keys.clone();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = asset.resolve(&keys, resolver.as_ref()).await;
            // Completion is re-dispatched onto the control task; it must
            // not touch coordinator state from here.
            let _ = events_tx.send(CoordinatorEvent::ResolutionCompleted { generation, outcome });
        });
    }

    /// Play, restarting from the beginning if the previous playback reached
    /// its natural end. The visible state change follows the engine's rate
    /// event rather than being set here.
    pub fn issue_play(&mut self) {
        if self.strategy == PlayStrategy::RestartFromStart {
            self.strategy = PlayStrategy::Resume;
            self.engine.seek_to_start();
        }
        self.engine.play();
    }

    /// Pause. Safe to call at any time, including before any source is set.
    pub fn issue_pause(&mut self) {
        self.engine.pause();
    }

    /// Dispatch one control-task event
    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::SetSource(source) => self.set_source(source),
            CoordinatorEvent::IssuePlay => self.issue_play(),
            CoordinatorEvent::IssuePause => self.issue_pause(),
            CoordinatorEvent::ResolutionCompleted { generation, outcome } => {
                self.resolution_completed(generation, outcome)
            }
            CoordinatorEvent::Shutdown => {}
        }
    }

    /// React to an observed item event. Events for anything but the active
    /// item are discarded; they belong to a superseded source.
    pub fn handle_item_event(&mut self, item: ItemId, event: ItemEvent) {
        if self.item.as_ref().map(PlaybackItem::id) != Some(item) {
            debug!(%item, "discarding event for superseded item");
            return;
        }
        match event {
            ItemEvent::Status(status) => self.item_status_changed(status),
            ItemEvent::ReachedEnd => {
                // Display still reflects the actual rate; only the next
                // play request changes behavior.
                debug!(%item, "natural end reached, next play restarts");
                self.strategy = PlayStrategy::RestartFromStart;
            }
        }
    }

    /// React to an engine status event
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::CurrentItemChanged(None) => self.surface.set_enabled(false),
            EngineEvent::CurrentItemChanged(Some(id)) => {
                // Fit mode is fixed: preserve aspect ratio within bounds.
                self.render.attach_output(&self.engine, VideoGravity::ResizeAspect);
                self.sync_affordance();
                let active_and_ready = self.item.as_ref().map(PlaybackItem::id) == Some(id)
                    && self
                        .item
                        .as_ref()
                        .map(|item| item.status() == ItemStatus::Ready)
                        .unwrap_or(false);
                if active_and_ready {
                    self.transition(SourcePhase::Ready);
                }
            }
            EngineEvent::RateChanged(_) => self.sync_affordance(),
        }
    }

    /// Process one pending event, waiting if none is queued. Returns false
    /// once the loop should stop.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            maybe = self.events_rx.recv() => match maybe {
                Some(CoordinatorEvent::Shutdown) | None => return false,
                Some(event) => self.handle_event(event),
            },
            Some(event) = self.engine_events.next_event() => self.handle_engine_event(event),
            maybe = Self::observed(self.observer.as_mut()) => match maybe {
                Some((item, event)) => self.handle_item_event(item, event),
                None => self.observer = None,
            },
        }
        true
    }

    /// Run the control loop until shutdown
    pub async fn run(mut self) {
        info!("coordinator control loop started");
        while self.step().await {}
        info!("coordinator control loop stopped");
    }

    /// Process everything already queued without waiting. Returns the
    /// number of events handled.
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let before = handled;
            while let Ok(event) = self.events_rx.try_recv() {
                if matches!(event, CoordinatorEvent::Shutdown) {
                    continue;
                }
                self.handle_event(event);
                handled += 1;
            }
            while let Some(event) = self.engine_events.try_next_event() {
                self.handle_engine_event(event);
                handled += 1;
            }
            while let Some((item, event)) = self
                .observer
                .as_mut()
                .and_then(|observer| observer.try_next_event().map(|e| (observer.item(), e)))
            {
                self.handle_item_event(item, event);
                handled += 1;
            }
            if handled == before {
                return handled;
            }
        }
    }

    async fn observed(observer: Option<&mut ItemSubscription>) -> Option<(ItemId, ItemEvent)> {
        match observer {
            Some(subscription) => {
                let item = subscription.item();
                subscription.next_event().await.map(|event| (item, event))
            }
            None => std::future::pending().await,
        }
    }

    fn resolution_completed(&mut self, generation: u64, outcome: Result<()>) {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding resolution completion for superseded source"
            );
            return;
        }

        let Some(asset) = self.asset.clone() else {
            warn!("resolution completed with no tracked asset");
            return;
        };

        if let Err(error) = outcome {
            self.asset_failed_to_prepare(error);
            return;
        }

        // All keys have finished; a failed key and a cleanly resolved but
        // unplayable asset take the same path, differing only in diagnostics.
        match asset.first_failed_key() {
            Ok(Some(failed)) => {
                let error = Error::KeyResolutionFailed {
                    key: failed.key,
                    detail: failed.detail.unwrap_or_else(|| "unknown".into()),
                };
                self.asset_failed_to_prepare(error);
                return;
            }
            Ok(None) => {}
            Err(error) => {
                self.asset_failed_to_prepare(error);
                return;
            }
        }

        match asset.is_playable() {
            Ok(true) => self.prepare_to_play(&asset),
            Ok(false) => self.asset_failed_to_prepare(Error::NotPlayable {
                locator: asset.source().to_string(),
            }),
            Err(error) => self.asset_failed_to_prepare(error),
        }
    }

    /// Build, subscribe, and hand off the new item. Any previous item's
    /// observation is torn down first so a stale item's events can never be
    /// misattributed to the new source.
    fn prepare_to_play(&mut self, asset: &AssetHandle) {
        self.teardown_item();

        let item = match PlaybackItem::from_asset(asset) {
            Ok(item) => item,
            Err(error) => {
                self.asset_failed_to_prepare(error);
                return;
            }
        };
        let subscription = match item.subscribe() {
            Ok(subscription) => subscription,
            Err(error) => {
                self.asset_failed_to_prepare(error);
                return;
            }
        };

        info!(item = %item.id(), source = %item.source(), "item prepared, awaiting readiness");
        self.strategy = PlayStrategy::Resume;
        self.item = Some(item.clone());
        self.observer = Some(subscription);
        self.transition(SourcePhase::Preparing);

        // The handle is done once its item exists.
        let loader = asset.resource_loader();
        let source = asset.source().clone();
        self.asset = None;

        let pipeline = Arc::clone(&self.config.pipeline);
        tokio::spawn(async move {
            pipeline.prepare(source, item, loader).await;
        });
    }

    fn item_status_changed(&mut self, status: ItemStatus) {
        debug!(%status, "item status changed");
        self.sync_affordance();
        match status {
            ItemStatus::Unknown => self.surface.set_enabled(false),
            ItemStatus::Ready => {
                self.surface.set_enabled(true);
                if let Some(item) = self.item.clone() {
                    if self.engine.current_item_id() != Some(item.id()) {
                        self.engine.attach(item);
                    }
                }
            }
            ItemStatus::Failed => {
                self.transition(SourcePhase::Failed);
                match self.item.as_ref().and_then(PlaybackItem::last_error) {
                    Some(error) => self.present_failure(&error),
                    None => {
                        let error =
                            Error::ItemPreparationFailed("item failed without detail".into());
                        self.present_failure(&error);
                    }
                }
            }
        }
    }

    /// Resolution failed or the source is not playable: terminal for this
    /// source, recoverable only by setting a source again.
    fn asset_failed_to_prepare(&mut self, error: Error) {
        self.teardown_item();
        self.asset = None;
        self.transition(SourcePhase::Unplayable);
        self.present_failure(&error);
    }

    fn present_failure(&mut self, error: &Error) {
        warn!(code = error.error_code(), %error, "asset failed to prepare");
        self.surface.set_enabled(false);
        let (title, message) = error.user_facing();
        self.presenter.present_error(&title, &message);
    }

    /// Release the active item's subscription and drop the item, in that
    /// order.
    fn teardown_item(&mut self) {
        if let Some(item) = self.item.take() {
            if let Some(subscription) = self.observer.take() {
                item.release_subscription(subscription);
            }
            debug!(item = %item.id(), "previous item torn down");
        }
        self.observer = None;
    }

    fn sync_affordance(&mut self) {
        if self.engine.is_playing() {
            self.surface.show_pause_affordance();
        } else {
            self.surface.show_play_affordance();
        }
    }

    fn transition(&mut self, next: SourcePhase) {
        if self.phase == next {
            return;
        }
        if !self.phase.can_transition_to(next) {
            warn!(from = %self.phase, to = %next, "unexpected phase transition");
        }
        info!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }
}

impl std::fmt::Debug for ReadinessCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessCoordinator")
            .field("source", &self.source)
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .field("strategy", &self.strategy)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
