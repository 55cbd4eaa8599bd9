//! External boundary contracts driven by the coordinator
//!
//! These are side-effect sinks only: the coordinator derives control state
//! and pushes it out, it never reads anything back. The widgets, dialogs,
//! and rendering surface behind them live outside the core.

use crate::{engine::PlaybackEngine, types::VideoGravity};

/// Enable/disable and play/pause affordance presentation
pub trait ControlSurface: Send {
    fn set_enabled(&mut self, enabled: bool);
    fn show_play_affordance(&mut self);
    fn show_pause_affordance(&mut self);
}

/// Presents a human-readable error to the user
pub trait FailurePresenter: Send {
    fn present_error(&mut self, title: &str, message: &str);
}

/// Rendering attachment point; called once per current-item change where
/// the new item is present
pub trait RenderTarget: Send {
    fn attach_output(&mut self, engine: &PlaybackEngine, gravity: VideoGravity);
}
