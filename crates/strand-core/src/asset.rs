//! Asset handles and asynchronous key resolution
//!
//! An [`AssetHandle`] wraps one media source and the capability to resolve a
//! fixed set of descriptive keys asynchronously, at most once. Descriptive
//! state (`status_of`, `is_playable`) is only valid once resolution has
//! completed for all keys; earlier queries fail with
//! [`Error::PrematureQuery`].

use crate::{
    loader::{ResourceLoaderRegistration, ResourceRequest},
    types::{AssetKey, KeyStatus, MediaSource},
    Error, Result,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tracing::debug;
use url::Url;

/// Resolution outcome for one required key
#[derive(Debug, Clone, Serialize)]
pub struct KeyResolution {
    pub key: AssetKey,
    pub status: KeyStatus,
    /// Diagnostic detail for failed keys
    pub detail: Option<String>,
}

/// Everything the resolver learned about an asset
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    entries: Vec<KeyResolution>,
    playable: bool,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully resolved key
    pub fn record_loaded(&mut self, key: AssetKey) {
        self.entries.push(KeyResolution {
            key,
            status: KeyStatus::Loaded,
            detail: None,
        });
    }

    /// Record a key that failed to resolve
    pub fn record_failed(&mut self, key: AssetKey, detail: impl Into<String>) {
        self.entries.push(KeyResolution {
            key,
            status: KeyStatus::Failed,
            detail: Some(detail.into()),
        });
    }

    pub fn set_playable(&mut self, playable: bool) {
        self.playable = playable;
    }

    /// Status of a key; keys the resolver never touched report `Pending`
    pub fn status_of(&self, key: AssetKey) -> KeyStatus {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.status)
            .unwrap_or(KeyStatus::Pending)
    }

    pub fn is_playable(&self) -> bool {
        self.playable
    }

    pub fn first_failure(&self) -> Option<&KeyResolution> {
        self.entries.iter().find(|e| e.status == KeyStatus::Failed)
    }

    pub fn entries(&self) -> &[KeyResolution] {
        &self.entries
    }
}

/// Resolves the required descriptive keys for a source.
///
/// Implementations must not report completion before every requested key
/// has finished resolving, successfully or not.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(
        &self,
        source: &MediaSource,
        keys: &[AssetKey],
        loader: Option<&ResourceLoaderRegistration>,
    ) -> Result<ResolutionReport>;
}

struct AssetInner {
    source: MediaSource,
    loader: Mutex<Option<ResourceLoaderRegistration>>,
    requested: AtomicBool,
    report: Mutex<Option<ResolutionReport>>,
}

/// A source locator plus the capability to resolve its required keys.
///
/// Cheap to clone; all clones share the same resolution state.
#[derive(Clone)]
pub struct AssetHandle {
    inner: Arc<AssetInner>,
}

impl AssetHandle {
    pub fn new(source: MediaSource) -> Self {
        Self {
            inner: Arc::new(AssetInner {
                source,
                loader: Mutex::new(None),
                requested: AtomicBool::new(false),
                report: Mutex::new(None),
            }),
        }
    }

    pub fn source(&self) -> &MediaSource {
        &self.inner.source
    }

    /// Register the interception delegate.
    ///
    /// Must happen before resolution is requested; the delegate has to be in
    /// place before any network activity begins for this source.
    pub fn set_resource_loader(&self, registration: ResourceLoaderRegistration) -> Result<()> {
        if self.inner.requested.load(Ordering::SeqCst) {
            return Err(Error::LateLoaderRegistration);
        }
        *self.inner.loader.lock().expect("loader lock poisoned") = Some(registration);
        Ok(())
    }

    pub fn resource_loader(&self) -> Option<ResourceLoaderRegistration> {
        self.inner.loader.lock().expect("loader lock poisoned").clone()
    }

    /// Resolve the required keys, at most once per handle.
    ///
    /// Runs on whatever execution context the caller chooses; callers that
    /// share state with a control loop must re-dispatch the completion onto
    /// that loop rather than reacting here.
    pub async fn resolve(&self, keys: &[AssetKey], resolver: &dyn AssetResolver) -> Result<()> {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            return Err(Error::ResolutionAlreadyRequested);
        }
        debug!(source = %self.inner.source, ?keys, "resolving asset keys");
        let loader = self.resource_loader();
        let report = resolver.resolve(&self.inner.source, keys, loader.as_ref()).await?;
        *self.inner.report.lock().expect("report lock poisoned") = Some(report);
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.report.lock().expect("report lock poisoned").is_some()
    }

    /// Resolution status of one key; fails before resolution completes
    pub fn status_of(&self, key: AssetKey) -> Result<KeyStatus> {
        self.with_report(|report| report.status_of(key))
    }

    /// Whether the resolved asset reports itself playable; fails before
    /// resolution completes
    pub fn is_playable(&self) -> Result<bool> {
        self.with_report(ResolutionReport::is_playable)
    }

    /// First key that failed to resolve, for diagnostic messaging
    pub fn first_failed_key(&self) -> Result<Option<KeyResolution>> {
        self.with_report(|report| report.first_failure().cloned())
    }

    fn with_report<T>(&self, f: impl FnOnce(&ResolutionReport) -> T) -> Result<T> {
        self.inner
            .report
            .lock()
            .expect("report lock poisoned")
            .as_ref()
            .map(f)
            .ok_or(Error::PrematureQuery)
    }
}

impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("source", &self.inner.source)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Resolver that probes the manifest over HTTP.
///
/// Playability is derived from the manifest's shape (extension, MIME type,
/// leading markers), not from parsing it; manifest interpretation stays out
/// of scope.
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn probe_playable(
        &self,
        source: &MediaSource,
        loader: Option<&ResourceLoaderRegistration>,
    ) -> Result<bool> {
        let request = ResourceRequest::new(source.locator().clone());

        // The delegate gets first refusal on every request.
        if let Some(registration) = loader {
            if let Some(response) = registration.intercept(request).await {
                return Ok(looks_like_manifest(
                    source.locator(),
                    response.content_type.as_deref(),
                    &response.body,
                ));
            }
        }

        let response = self.client.get(source.locator().clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::ManifestFetch(format!(
                "{}: HTTP {}",
                source.locator(),
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(looks_like_manifest(source.locator(), content_type.as_deref(), &body))
    }
}

impl Default for HttpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetResolver for HttpResolver {
    async fn resolve(
        &self,
        source: &MediaSource,
        keys: &[AssetKey],
        loader: Option<&ResourceLoaderRegistration>,
    ) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::new();
        for key in keys {
            match key {
                AssetKey::Playable => match self.probe_playable(source, loader).await {
                    Ok(playable) => {
                        report.record_loaded(*key);
                        report.set_playable(playable);
                    }
                    Err(error) => report.record_failed(*key, error.to_string()),
                },
            }
        }
        Ok(report)
    }
}

/// Heuristic playability check on manifest shape
pub fn looks_like_manifest(url: &Url, content_type: Option<&str>, body: &[u8]) -> bool {
    let path = url.path().to_lowercase();
    if path.ends_with(".mpd") || path.ends_with(".m3u8") || path.ends_with(".m3u") {
        return true;
    }

    if let Some(content_type) = content_type {
        let content_type = content_type.to_lowercase();
        if content_type.contains("dash+xml") || content_type.contains("mpegurl") {
            return true;
        }
    }

    let head = String::from_utf8_lossy(&body[..body.len().min(512)]);
    head.starts_with("#EXTM3U") || head.contains("<MPD")
}
