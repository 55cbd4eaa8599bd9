//! Resource-loading delegate boundary
//!
//! A registered delegate may intercept manifest/segment requests and serve
//! synthetic responses (custom URL schemes, manifest rewriting). The core
//! registers the delegate before requesting resolution and never inspects
//! what it does with a request.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::runtime::Handle;
use url::Url;

/// A request the delegate may choose to intercept
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub url: Url,
}

impl ResourceRequest {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

/// A synthetic response served by the delegate
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    /// MIME type, if the delegate knows it
    pub content_type: Option<String>,
    /// Response payload
    pub body: Bytes,
}

impl ResourceResponse {
    pub fn new(content_type: Option<String>, body: Bytes) -> Self {
        Self { content_type, body }
    }
}

/// Pluggable interception delegate for resource requests
#[async_trait]
pub trait ResourceLoading: Send + Sync {
    /// Return `Some` to serve the request synthetically, `None` to let it
    /// go to the network untouched.
    async fn intercept(&self, request: ResourceRequest) -> Option<ResourceResponse>;
}

/// A delegate paired with the execution context its callbacks run on.
///
/// Both must be supplied together, before any network activity begins for
/// the source the registration is attached to.
#[derive(Clone)]
pub struct ResourceLoaderRegistration {
    delegate: Arc<dyn ResourceLoading>,
    context: Handle,
}

impl ResourceLoaderRegistration {
    pub fn new(delegate: Arc<dyn ResourceLoading>, context: Handle) -> Self {
        Self { delegate, context }
    }

    /// Offer a request to the delegate on its registered execution context.
    ///
    /// `None` means the delegate declined and the request should go to the
    /// network.
    pub async fn intercept(&self, request: ResourceRequest) -> Option<ResourceResponse> {
        let delegate = Arc::clone(&self.delegate);
        self.context
            .spawn(async move { delegate.intercept(request).await })
            .await
            .ok()
            .flatten()
    }
}

impl std::fmt::Debug for ResourceLoaderRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoaderRegistration").finish_non_exhaustive()
    }
}
