//! Core types for Strand

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A locator identifying the media to be resolved and played.
///
/// Immutable once created; a new locator always creates a new `MediaSource`,
/// never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSource {
    locator: Url,
}

impl MediaSource {
    pub fn new(locator: Url) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Url {
        &self.locator
    }
}

impl From<Url> for MediaSource {
    fn from(locator: Url) -> Self {
        Self::new(locator)
    }
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.locator)
    }
}

/// Unique identifier for a playback item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive keys an asset must resolve before playback can be considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKey {
    /// Can this source be played at all
    Playable,
}

impl AssetKey {
    /// The fixed set of keys required before an item may be built
    pub const REQUIRED: &'static [AssetKey] = &[AssetKey::Playable];
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKey::Playable => write!(f, "playable"),
        }
    }
}

/// Resolution status of a single required key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyStatus {
    Pending,
    Loaded,
    Failed,
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyStatus::Pending => write!(f, "pending"),
            KeyStatus::Loaded => write!(f, "loaded"),
            KeyStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Readiness status of a playback item.
///
/// Monotonic: `Unknown` may move to `Ready` or `Failed`, `Ready` may move to
/// `Failed`. There is no in-place reset; replacement is the only reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Unknown,
    Ready,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Unknown => write!(f, "unknown"),
            ItemStatus::Ready => write!(f, "ready"),
            ItemStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Externally visible control state, derived from current item presence,
/// item readiness, and engine rate. Never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlState {
    Disabled,
    ShowPlay,
    ShowPause,
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlState::Disabled => write!(f, "disabled"),
            ControlState::ShowPlay => write!(f, "show-play"),
            ControlState::ShowPause => write!(f, "show-pause"),
        }
    }
}

/// What the next play request should do with the playback position.
///
/// Set to `RestartFromStart` when the natural-end signal fires, cleared on
/// attach or once the restart has been performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayStrategy {
    Resume,
    RestartFromStart,
}

impl Default for PlayStrategy {
    fn default() -> Self {
        PlayStrategy::Resume
    }
}

/// Lifecycle phase of the currently tracked source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcePhase {
    /// No source set
    Idle,
    /// Asset key resolution in flight
    Resolving,
    /// Resolution failed or the source is not playable (terminal for this source)
    Unplayable,
    /// Item built, readiness not yet known
    Preparing,
    /// Item ready and current in the engine
    Ready,
    /// Item reported failure (terminal for this source)
    Failed,
}

impl SourcePhase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: SourcePhase) -> bool {
        use SourcePhase::*;
        matches!(
            (self, target),
            // A new source always restarts resolution, from any phase
            (Idle, Resolving)
                | (Resolving, Resolving)
                | (Unplayable, Resolving)
                | (Preparing, Resolving)
                | (Ready, Resolving)
                | (Failed, Resolving)
                // Resolution outcome
                | (Resolving, Unplayable)
                | (Resolving, Preparing)
                // Item lifecycle
                | (Preparing, Ready)
                | (Preparing, Failed)
                | (Ready, Failed)
        )
    }
}

impl std::fmt::Display for SourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourcePhase::Idle => write!(f, "idle"),
            SourcePhase::Resolving => write!(f, "resolving"),
            SourcePhase::Unplayable => write!(f, "unplayable"),
            SourcePhase::Preparing => write!(f, "preparing"),
            SourcePhase::Ready => write!(f, "ready"),
            SourcePhase::Failed => write!(f, "failed"),
        }
    }
}

/// How rendered video is fitted into the output bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoGravity {
    /// Preserve aspect ratio, fit within bounds
    ResizeAspect,
    /// Preserve aspect ratio, fill bounds (may crop)
    ResizeAspectFill,
    /// Stretch to bounds
    Resize,
}

impl std::fmt::Display for VideoGravity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoGravity::ResizeAspect => write!(f, "resize-aspect"),
            VideoGravity::ResizeAspectFill => write!(f, "resize-aspect-fill"),
            VideoGravity::Resize => write!(f, "resize"),
        }
    }
}
