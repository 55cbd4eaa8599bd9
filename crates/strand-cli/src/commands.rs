//! Command implementations and console-backed boundary adapters

use anyhow::Context;
use console::style;
use std::time::Duration;
use strand_core::{
    AssetKey, AssetResolver, ControlSurface, CoordinatorConfig, FailurePresenter, HttpResolver,
    KeyStatus, MediaSource, PlaybackEngine, ReadinessCoordinator, RenderTarget, SourcePhase,
    VideoGravity,
};
use url::Url;

/// DASH conformance streams used when no source is given
pub const TEST_STREAMS: &[&str] = &[
    "https://dash.akamaized.net/dash264/TestCasesHD/1b/qualcomm/1/MultiRate.mpd",
    "https://dash.akamaized.net/dash264/TestCasesHD/1b/qualcomm/2/MultiRate.mpd",
    "https://dash.akamaized.net/dash264/TestCasesHD/2b/qualcomm/1/MultiResMPEG2.mpd",
    "https://dash.akamaized.net/dash264/TestCasesHD/2b/qualcomm/2/MultiRes.mpd",
    "https://dash.akamaized.net/dash264/TestCases/1b/qualcomm/1/MultiRatePatched.mpd",
    "https://dash.akamaized.net/dash264/TestCases/1b/qualcomm/2/MultiRate.mpd",
    "https://dash.akamaized.net/dash264/TestCases/2b/qualcomm/1/MultiResMPEG2.mpd",
    "https://dash.akamaized.net/dash264/TestCases/2b/qualcomm/2/MultiRes.mpd",
    "https://dash.akamaized.net/dash264/TestCases/9b/qualcomm/1/MultiRate.mpd",
    "https://dash.akamaized.net/dash264/TestCases/9b/qualcomm/2/MultiRate.mpd",
];

/// How often the simulated playhead advances
const TICK: Duration = Duration::from_millis(200);

// =============================================================================
// Console boundary adapters
// =============================================================================

/// Prints control-state changes; deduplicates so steady state stays quiet
struct ConsoleSurface {
    enabled: Option<bool>,
    playing_affordance: Option<bool>,
}

impl ConsoleSurface {
    fn new() -> Self {
        Self {
            enabled: None,
            playing_affordance: None,
        }
    }
}

impl ControlSurface for ConsoleSurface {
    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == Some(enabled) {
            return;
        }
        self.enabled = Some(enabled);
        let state = if enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!("controls: {state}");
    }

    fn show_play_affordance(&mut self) {
        if self.playing_affordance == Some(false) {
            return;
        }
        self.playing_affordance = Some(false);
        println!("controls: [ {} ]", style("play").bold());
    }

    fn show_pause_affordance(&mut self) {
        if self.playing_affordance == Some(true) {
            return;
        }
        self.playing_affordance = Some(true);
        println!("controls: [ {} ]", style("pause").bold());
    }
}

struct ConsolePresenter;

impl FailurePresenter for ConsolePresenter {
    fn present_error(&mut self, title: &str, message: &str) {
        eprintln!("{}: {message}", style(title).red().bold());
    }
}

struct ConsoleRender;

impl RenderTarget for ConsoleRender {
    fn attach_output(&mut self, engine: &PlaybackEngine, gravity: VideoGravity) {
        if let Some(item) = engine.current_item_id() {
            println!("output attached: item {item} ({gravity})");
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Resolve the required keys for a source and report what was learned
pub async fn probe(source_url: &str, json: bool) -> anyhow::Result<()> {
    let locator = Url::parse(source_url).context("invalid source URL")?;
    let source = MediaSource::new(locator);
    let resolver = HttpResolver::new();

    let report = resolver
        .resolve(&source, AssetKey::REQUIRED, None)
        .await
        .context("key resolution failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {source}", style("source:").bold());
    for entry in report.entries() {
        match (&entry.status, &entry.detail) {
            (KeyStatus::Failed, Some(detail)) => {
                println!("  {:<10} {} ({detail})", entry.key.to_string(), style(entry.status).red())
            }
            _ => println!("  {:<10} {}", entry.key.to_string(), entry.status),
        }
    }

    if report.is_playable() {
        println!("{}", style("playable").green().bold());
        Ok(())
    } else {
        println!("{}", style("not playable").red().bold());
        anyhow::bail!("{source} is not playable");
    }
}

/// Run one simulated playback session to its natural end
pub async fn play(source_url: &str, duration: f64, replay: bool) -> anyhow::Result<()> {
    let locator = Url::parse(source_url).context("invalid source URL")?;
    let source = MediaSource::new(locator);

    let mut coordinator = ReadinessCoordinator::new(
        CoordinatorConfig::default(),
        Box::new(ConsoleSurface::new()),
        Box::new(ConsolePresenter),
        Box::new(ConsoleRender),
    );
    coordinator.set_source(source.clone());

    let mut ticker = tokio::time::interval(TICK);
    let mut started = false;
    let mut replays_left = usize::from(replay);
    let mut last_logged_second = 0u64;

    loop {
        ticker.tick().await;
        coordinator.drain_pending();

        match coordinator.phase() {
            SourcePhase::Unplayable | SourcePhase::Failed => {
                anyhow::bail!("{source} cannot be played");
            }
            SourcePhase::Ready if !started => {
                started = true;
                tracing::info!(%source, duration, "session ready, starting playback");
                coordinator.issue_play();
                continue;
            }
            _ => {}
        }

        if !coordinator.engine().is_playing() {
            continue;
        }

        let position = coordinator.engine_mut().advance(TICK);
        let whole = position as u64;
        if whole > last_logged_second && whole % 5 == 0 {
            last_logged_second = whole;
            println!("position: {whole}s / {duration}s");
        }

        if position >= duration {
            // The driver reports the natural end to the item, then stops.
            if let Some(item) = coordinator.item() {
                item.signal_ended();
            }
            coordinator.issue_pause();
            coordinator.drain_pending();

            if replays_left > 0 {
                replays_left -= 1;
                last_logged_second = 0;
                println!("{}", style("replaying from the start").bold());
                coordinator.issue_play();
            } else {
                break;
            }
        }
    }

    println!("{}", style("playback finished").green().bold());
    Ok(())
}

/// Print the built-in test stream catalog
pub fn streams() {
    println!("{}", style("built-in test streams:").bold());
    for (index, url) in TEST_STREAMS.iter().enumerate() {
        println!("  [{index}] {url}");
    }
}
