//! Strand Core - Playback readiness library for Strand
//!
//! This crate provides the lifecycle machinery for playing a remotely
//! hosted, manifest-described media stream:
//! - Asynchronous asset key resolution with at-most-once semantics
//! - Playback item construction, readiness observation, and failure payloads
//! - A playback engine holding the current item and driving rate
//! - Resource-request interception for custom URL schemes
//! - A readiness coordinator translating it all into control-surface state
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Strand Core                             │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Asset     │  │   Playback   │  │    Media     │          │
//! │  │    Handle    │  │     Item     │  │   Pipeline   │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                  │
//! │         └─────────────────┼─────────────────┘                  │
//! │                           │                                    │
//! │                   ┌───────┴───────┐                            │
//! │                   │   Readiness   │                            │
//! │                   │  Coordinator  │                            │
//! │                   └───────┬───────┘                            │
//! │                           │                                    │
//! │  ┌──────────────┐  ┌──────┴───────┐  ┌──────────────┐          │
//! │  │   Control    │  │   Playback   │  │   Failure    │          │
//! │  │   Surface    │  │    Engine    │  │  Presenter   │          │
//! │  └──────────────┘  └──────────────┘  └──────────────┘          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All lifecycle state is owned by the coordinator's control task;
//! asynchronous completions are re-dispatched onto it as events, tagged with
//! the generation they were requested under so stale completions can be
//! discarded deterministically.

pub mod error;
pub mod types;
pub mod loader;
pub mod asset;
pub mod item;
pub mod engine;
pub mod pipeline;
pub mod surface;
pub mod coordinator;

pub use error::{Error, Result};
pub use types::*;
pub use loader::{ResourceLoaderRegistration, ResourceLoading, ResourceRequest, ResourceResponse};
pub use asset::{AssetHandle, AssetResolver, HttpResolver, KeyResolution, ResolutionReport};
pub use item::{ItemEvent, ItemSubscription, PlaybackItem};
pub use engine::{EngineEvent, EngineSubscription, PlaybackEngine};
pub use pipeline::{HttpPipeline, InertPipeline, MediaPipeline};
pub use surface::{ControlSurface, FailurePresenter, RenderTarget};
pub use coordinator::{CoordinatorConfig, CoordinatorEvent, CoordinatorHandle, ReadinessCoordinator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the playback library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Strand Core initialized");
}
