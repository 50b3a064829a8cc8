//! camkiosk - unattended camera stream kiosk
//!
//! Cycles through a list of live streams (embeds, HLS, web pages), detects
//! streams that never start or die mid-playback, and always moves forward.
//!
//! # Modules
//!
//! - `kiosk` - playback lifecycle controller, health gate, sessions
//! - `player` - one binding per stream kind plus the process launcher
//! - `source` - stream list file/HTTP source, poller, reachability prober
//! - `telemetry` - fire-and-forget events and metrics
//! - `ui` / `app` - terminal kiosk surface
//! - `cli` / `commands` - list management subcommands

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod kiosk;
pub mod models;
pub mod player;
pub mod source;
pub mod telemetry;
pub mod ui;

// Re-export commonly used types
pub use models::{
    EventKind, Health, PlaybackStatus, StreamDescriptor, StreamKind, StreamList, TelemetryEvent,
};

pub use app::App;
pub use config::Config;
pub use kiosk::{select_current, ControlEvent, Controller, KioskSettings, KioskView};
pub use player::{Launcher, PlayerBinding, PlayerContext, ProcessLauncher};
pub use telemetry::{Metrics, TelemetrySink};
