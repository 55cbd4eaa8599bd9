//! Integration tests for Strand Core

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use strand_core::{
    AssetKey, AssetResolver, ControlState, ControlSurface, CoordinatorConfig, FailurePresenter,
    InertPipeline, ItemStatus, MediaSource, PlaybackEngine, ReadinessCoordinator, RenderTarget,
    ResolutionReport, ResourceLoaderRegistration, ResourceLoading, ResourceRequest,
    ResourceResponse, Result, SourcePhase, VideoGravity,
};
use url::Url;

// =============================================================================
// Shared fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum SurfaceCall {
    Enabled(bool),
    ShowPlay,
    ShowPause,
}

#[derive(Clone, Default)]
struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    fn last_enabled(&self) -> Option<bool> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::Enabled(enabled) => Some(*enabled),
                _ => None,
            })
    }

    fn last_affordance(&self) -> Option<SurfaceCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::ShowPlay => Some(SurfaceCall::ShowPlay),
                SurfaceCall::ShowPause => Some(SurfaceCall::ShowPause),
                _ => None,
            })
    }
}

impl ControlSurface for RecordingSurface {
    fn set_enabled(&mut self, enabled: bool) {
        self.calls.lock().unwrap().push(SurfaceCall::Enabled(enabled));
    }
    fn show_play_affordance(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::ShowPlay);
    }
    fn show_pause_affordance(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::ShowPause);
    }
}

#[derive(Clone, Default)]
struct RecordingPresenter {
    presented: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingPresenter {
    fn presented(&self) -> Vec<(String, String)> {
        self.presented.lock().unwrap().clone()
    }
}

impl FailurePresenter for RecordingPresenter {
    fn present_error(&mut self, title: &str, message: &str) {
        self.presented
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Clone, Default)]
struct RecordingRender {
    attachments: Arc<Mutex<usize>>,
}

impl RecordingRender {
    fn attachments(&self) -> usize {
        *self.attachments.lock().unwrap()
    }
}

impl RenderTarget for RecordingRender {
    fn attach_output(&mut self, _engine: &PlaybackEngine, gravity: VideoGravity) {
        assert_eq!(gravity, VideoGravity::ResizeAspect);
        *self.attachments.lock().unwrap() += 1;
    }
}

/// Serves an HLS manifest for any intercepted request
struct ManifestServer;

#[async_trait]
impl ResourceLoading for ManifestServer {
    async fn intercept(&self, _request: ResourceRequest) -> Option<ResourceResponse> {
        Some(ResourceResponse::new(
            Some("application/vnd.apple.mpegurl".into()),
            Bytes::from_static(b"#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-ENDLIST\n"),
        ))
    }
}

/// Serves bytes that do not look like any supported manifest
struct BinaryServer;

#[async_trait]
impl ResourceLoading for BinaryServer {
    async fn intercept(&self, _request: ResourceRequest) -> Option<ResourceResponse> {
        Some(ResourceResponse::new(
            Some("video/mp4".into()),
            Bytes::from_static(&[0x00, 0x00, 0x00, 0x18]),
        ))
    }
}

/// Resolver whose verdict depends on the locator path
struct PathResolver;

#[async_trait]
impl AssetResolver for PathResolver {
    async fn resolve(
        &self,
        source: &MediaSource,
        keys: &[AssetKey],
        _loader: Option<&ResourceLoaderRegistration>,
    ) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::new();
        for key in keys {
            report.record_loaded(*key);
        }
        report.set_playable(!source.locator().path().contains("unplayable"));
        Ok(report)
    }
}

struct Harness {
    coordinator: ReadinessCoordinator,
    surface: RecordingSurface,
    presenter: RecordingPresenter,
    render: RecordingRender,
}

fn harness(config: CoordinatorConfig) -> Harness {
    let surface = RecordingSurface::default();
    let presenter = RecordingPresenter::default();
    let render = RecordingRender::default();
    let coordinator = ReadinessCoordinator::new(
        config,
        Box::new(surface.clone()),
        Box::new(presenter.clone()),
        Box::new(render.clone()),
    );
    Harness {
        coordinator,
        surface,
        presenter,
        render,
    }
}

fn stub_config() -> CoordinatorConfig {
    CoordinatorConfig {
        required_keys: AssetKey::REQUIRED.to_vec(),
        resolver: Arc::new(PathResolver),
        pipeline: Arc::new(InertPipeline),
        loader: None,
    }
}

fn source(url: &str) -> MediaSource {
    MediaSource::new(Url::parse(url).unwrap())
}

/// Let spawned resolution/pipeline tasks finish and process what they queued
async fn settle(coordinator: &mut ReadinessCoordinator) {
    for _ in 0..64 {
        tokio::task::yield_now().await;
        coordinator.drain_pending();
    }
}

// =============================================================================
// End-to-end readiness via request interception
// =============================================================================

#[tokio::test]
async fn test_intercepted_source_reaches_ready_without_network() {
    // Default resolver and pipeline, but every request is served by the
    // registered delegate: no socket is ever opened.
    let config = CoordinatorConfig {
        loader: Some(ResourceLoaderRegistration::new(
            Arc::new(ManifestServer),
            tokio::runtime::Handle::current(),
        )),
        ..CoordinatorConfig::default()
    };
    let mut harness = harness(config);

    harness
        .coordinator
        .set_source(source("custom://host/stream"));
    settle(&mut harness.coordinator).await;

    assert_eq!(harness.coordinator.phase(), SourcePhase::Ready);
    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPlay);
    assert_eq!(harness.surface.last_enabled(), Some(true));
    assert_eq!(harness.render.attachments(), 1);
    assert!(harness.presenter.presented().is_empty());

    let item = harness.coordinator.item().unwrap();
    assert_eq!(item.status(), ItemStatus::Ready);
    assert_eq!(
        harness.coordinator.engine().current_item_id(),
        Some(item.id())
    );
}

#[tokio::test]
async fn test_intercepted_binary_source_is_not_playable() {
    let config = CoordinatorConfig {
        loader: Some(ResourceLoaderRegistration::new(
            Arc::new(BinaryServer),
            tokio::runtime::Handle::current(),
        )),
        ..CoordinatorConfig::default()
    };
    let mut harness = harness(config);

    harness
        .coordinator
        .set_source(source("custom://host/movie"));
    settle(&mut harness.coordinator).await;

    assert_eq!(harness.coordinator.phase(), SourcePhase::Unplayable);
    assert_eq!(harness.surface.last_enabled(), Some(false));
    assert!(harness.coordinator.item().is_none());
    assert!(harness.coordinator.engine().current_item_id().is_none());

    let presented = harness.presenter.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].0, "Item cannot be played");
    assert_eq!(
        presented[0].1,
        "The contents of the resource at the specified URL are not playable."
    );
}

// =============================================================================
// Transport control across the whole stack
// =============================================================================

#[tokio::test]
async fn test_transport_play_pause_and_restart_after_natural_end() {
    let mut harness = harness(stub_config());

    harness
        .coordinator
        .set_source(source("https://example.com/stream.mpd"));
    settle(&mut harness.coordinator).await;
    harness.coordinator.item().unwrap().mark_ready();
    settle(&mut harness.coordinator).await;

    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPlay);

    harness.coordinator.issue_play();
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPause);
    assert_eq!(
        harness.surface.last_affordance(),
        Some(SurfaceCall::ShowPause)
    );

    harness
        .coordinator
        .engine_mut()
        .advance(std::time::Duration::from_secs(30));

    // pausing keeps the position; playing again resumes in place
    harness.coordinator.issue_pause();
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPlay);
    harness.coordinator.issue_play();
    settle(&mut harness.coordinator).await;
    assert!(harness.coordinator.engine().position() > 0.0);

    // natural end: the driver signals the item and stops the engine
    harness.coordinator.item().unwrap().signal_ended();
    harness.coordinator.engine_mut().pause();
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPlay);
    assert_eq!(harness.surface.last_enabled(), Some(true));

    // the next play starts over from the beginning
    harness.coordinator.issue_play();
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.engine().position(), 0.0);
    assert!(harness.coordinator.engine().is_playing());
}

// =============================================================================
// Source replacement and recovery
// =============================================================================

#[tokio::test]
async fn test_replacing_source_supersedes_pending_resolution() {
    let mut harness = harness(stub_config());

    // The first source would fail; replacing it before its completion is
    // handled must leave no trace of the first outcome.
    harness
        .coordinator
        .set_source(source("https://example.com/unplayable.mpd"));
    harness
        .coordinator
        .set_source(source("https://example.com/good.mpd"));
    settle(&mut harness.coordinator).await;

    assert!(harness.presenter.presented().is_empty());
    assert_eq!(harness.coordinator.phase(), SourcePhase::Preparing);
    assert_eq!(
        harness.coordinator.item().unwrap().source().to_string(),
        "https://example.com/good.mpd"
    );
}

#[tokio::test]
async fn test_failed_source_can_be_retried_by_setting_again() {
    let mut harness = harness(stub_config());
    let src = source("https://example.com/unplayable.mpd");

    harness.coordinator.set_source(src.clone());
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.phase(), SourcePhase::Unplayable);
    assert_eq!(harness.presenter.presented().len(), 1);

    // failures are never retried automatically; setting the source again,
    // even the same one, restarts resolution from scratch
    harness.coordinator.set_source(src);
    settle(&mut harness.coordinator).await;
    assert_eq!(harness.coordinator.phase(), SourcePhase::Unplayable);
    assert_eq!(harness.presenter.presented().len(), 2);
}

#[tokio::test]
async fn test_replacement_after_ready_swaps_item_atomically() {
    let mut harness = harness(stub_config());

    harness
        .coordinator
        .set_source(source("https://example.com/first.mpd"));
    settle(&mut harness.coordinator).await;
    harness.coordinator.item().unwrap().mark_ready();
    settle(&mut harness.coordinator).await;
    let first_id = harness.coordinator.item().unwrap().id();
    assert_eq!(
        harness.coordinator.engine().current_item_id(),
        Some(first_id)
    );

    harness
        .coordinator
        .set_source(source("https://example.com/second.mpd"));
    settle(&mut harness.coordinator).await;
    harness.coordinator.item().unwrap().mark_ready();
    settle(&mut harness.coordinator).await;

    let second_id = harness.coordinator.item().unwrap().id();
    assert_ne!(first_id, second_id);
    assert_eq!(
        harness.coordinator.engine().current_item_id(),
        Some(second_id)
    );
    assert_eq!(harness.coordinator.control_state(), ControlState::ShowPlay);
    // one attachment per current-item change
    assert_eq!(harness.render.attachments(), 2);
}

// =============================================================================
// Control-loop embedding
// =============================================================================

#[tokio::test]
async fn test_handle_commands_drive_a_spawned_loop() {
    let harness = harness(stub_config());
    let handle = harness.coordinator.handle();
    let presenter = harness.presenter.clone();

    let task = tokio::spawn(harness.coordinator.run());

    handle
        .set_source(source("https://example.com/unplayable.mpd"))
        .unwrap();
    for _ in 0..200 {
        tokio::task::yield_now().await;
        if !presenter.presented().is_empty() {
            break;
        }
    }
    handle.shutdown().unwrap();
    task.await.unwrap();

    let presented = presenter.presented();
    assert_eq!(presented.len(), 1);
    assert_eq!(presented[0].0, "Item cannot be played");

    // the loop is gone; further commands report it closed
    assert!(handle.issue_play().is_err());
}
