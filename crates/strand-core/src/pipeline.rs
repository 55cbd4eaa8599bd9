//! Media preparation collaborator
//!
//! Once the coordinator has built and subscribed a [`PlaybackItem`], the
//! pipeline is what drives the item's readiness status. In a full player
//! this is the buffering/decoding machinery; here it is a narrow boundary so
//! embedders (and tests) can drive items themselves.

use crate::{
    item::PlaybackItem,
    loader::{ResourceLoaderRegistration, ResourceRequest},
    types::MediaSource,
    Error,
};
use async_trait::async_trait;
use tracing::debug;

/// Drives a freshly built item to `Ready` or `Failed`
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    async fn prepare(
        &self,
        source: MediaSource,
        item: PlaybackItem,
        loader: Option<ResourceLoaderRegistration>,
    );
}

/// Pipeline that fetches the manifest once and marks the item ready when it
/// arrives. The registered delegate gets first refusal on the request.
pub struct HttpPipeline {
    client: reqwest::Client,
}

impl HttpPipeline {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_manifest(
        &self,
        source: &MediaSource,
        loader: Option<&ResourceLoaderRegistration>,
    ) -> crate::Result<usize> {
        if let Some(registration) = loader {
            let request = ResourceRequest::new(source.locator().clone());
            if let Some(response) = registration.intercept(request).await {
                return Ok(response.body.len());
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
        Ok(response.bytes().await?.len())
    }
}

impl Default for HttpPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPipeline for HttpPipeline {
    async fn prepare(
        &self,
        source: MediaSource,
        item: PlaybackItem,
        loader: Option<ResourceLoaderRegistration>,
    ) {
        match self.fetch_manifest(&source, loader.as_ref()).await {
            Ok(bytes) if bytes > 0 => {
                debug!(item = %item.id(), bytes, "manifest fetched, item ready");
                item.mark_ready();
            }
            Ok(_) => item.fail(Error::ItemPreparationFailed(format!(
                "{source}: empty manifest"
            ))),
            Err(error) => item.fail(error),
        }
    }
}

/// Pipeline that does nothing; the embedder drives the item directly
pub struct InertPipeline;

#[async_trait]
impl MediaPipeline for InertPipeline {
    async fn prepare(
        &self,
        _source: MediaSource,
        _item: PlaybackItem,
        _loader: Option<ResourceLoaderRegistration>,
    ) {
    }
}
