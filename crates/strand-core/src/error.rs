//! Error types for Strand Core

use crate::types::AssetKey;
use thiserror::Error;

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Playback readiness error types
#[derive(Error, Debug)]
pub enum Error {
    // Asset preparation errors
    #[error("Required key '{key}' failed to resolve: {detail}")]
    KeyResolutionFailed { key: AssetKey, detail: String },

    #[error("Source is not playable: {locator}")]
    NotPlayable { locator: String },

    #[error("Item preparation failed: {0}")]
    ItemPreparationFailed(String),

    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    // Usage errors
    #[error("Asset queried before resolution completed")]
    PrematureQuery,

    #[error("Resolution was already requested for this asset")]
    ResolutionAlreadyRequested,

    #[error("Resource loader must be registered before resolution is requested")]
    LateLoaderRegistration,

    #[error("An observer is already subscribed")]
    AlreadySubscribed,

    #[error("Re-subscribing after release is not supported")]
    SubscriptionReplayed,

    #[error("Coordinator control loop is no longer running")]
    ControlLoopClosed,

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Returns the error code for diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::KeyResolutionFailed { .. } => "KEY_RESOLUTION",
            Error::NotPlayable { .. } => "NOT_PLAYABLE",
            Error::ItemPreparationFailed(_) => "ITEM_PREPARATION",
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::PrematureQuery => "PREMATURE_QUERY",
            Error::ResolutionAlreadyRequested => "RESOLUTION_REPEATED",
            Error::LateLoaderRegistration => "LATE_LOADER",
            Error::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            Error::SubscriptionReplayed => "SUBSCRIPTION_REPLAYED",
            Error::ControlLoopClosed => "CONTROL_LOOP_CLOSED",
            Error::Network(_) => "NETWORK",
        }
    }

    /// Title and message pair handed to the failure presenter.
    ///
    /// The three preparation failures present identically at the UI
    /// boundary; only the diagnostic message differs.
    pub fn user_facing(&self) -> (String, String) {
        match self {
            Error::NotPlayable { .. } => (
                "Item cannot be played".to_string(),
                "The contents of the resource at the specified URL are not playable.".to_string(),
            ),
            Error::KeyResolutionFailed { .. }
            | Error::ItemPreparationFailed(_)
            | Error::ManifestFetch(_)
            | Error::Network(_) => ("Item cannot be played".to_string(), self.to_string()),
            other => ("Playback error".to_string(), other.to_string()),
        }
    }

    /// Returns true if setting a source again can clear this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::KeyResolutionFailed { .. }
                | Error::NotPlayable { .. }
                | Error::ItemPreparationFailed(_)
                | Error::ManifestFetch(_)
                | Error::Network(_)
        )
    }
}
