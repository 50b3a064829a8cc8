//! camkiosk - unattended camera stream kiosk
//!
//! Rotates through live camera streams, showing each for its dwell period and
//! skipping any that never become ready or fail mid-playback.
//!
//! # Usage
//!
//! ```bash
//! # Start the kiosk with the terminal surface
//! camkiosk
//!
//! # Start without the TUI (systemd, autostart)
//! camkiosk run --headless
//!
//! # Manage the stream list
//! camkiosk add harbor "Harbor Cam" hls https://cams.example.org/harbor.m3u8
//! camkiosk list --health
//! ```

use std::io::{stdout, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camkiosk::app::{App, KeyAction};
use camkiosk::cli::{Cli, Command, ExitCode, Output};
use camkiosk::commands;
use camkiosk::config::Config;
use camkiosk::kiosk::{ControlEvent, Controller, KioskSettings, KioskView};
use camkiosk::player::{PlayerContext, ProcessLauncher, SurfaceTarget};
use camkiosk::source::{self, ListSource};
use camkiosk::telemetry::{self, Metrics};
use camkiosk::ui;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let output = Output::new(&cli);
            let code = output.error(format!("{:#}", e), ExitCode::InvalidArgs);
            std::process::exit(code.into());
        }
    };

    if cli.is_cli_mode() {
        init_logging("warn", None)?;
        let exit_code = run_cli(cli, &config).await;
        std::process::exit(exit_code.into());
    }

    if cli.is_headless() {
        init_logging("info", None)?;
        run_kiosk(config, true).await
    } else {
        init_logging("info", Some(&config.log_path()))?;
        run_kiosk(config, false).await
    }
}

/// Log to a file while the TUI owns the terminal, to stderr otherwise.
/// `RUST_LOG` overrides the default level.
fn init_logging(default_level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: &Config) -> ExitCode {
    let output = Output::new(&cli);
    let config_path = cli.config.clone();

    match cli.command {
        Some(Command::List(cmd)) => commands::list_cmd(cmd, config, &output).await,
        Some(Command::Add(cmd)) => commands::add_cmd(cmd, config, &output),
        Some(Command::Remove(cmd)) => commands::remove_cmd(cmd, config, &output),
        Some(Command::Check(cmd)) => commands::check_cmd(cmd, config, &output).await,
        Some(Command::Config(cmd)) => {
            commands::config_cmd(cmd, config, config_path.as_deref(), &output)
        }
        // Handled by is_cli_mode
        Some(Command::Run(_)) | None => ExitCode::Success,
    }
}

// =============================================================================
// Kiosk
// =============================================================================

async fn run_kiosk(config: Config, headless: bool) -> Result<()> {
    let metrics = Arc::new(Metrics::new());
    let (sink, telemetry_task) =
        telemetry::spawn(metrics.clone(), config.telemetry.endpoint.clone());

    let launcher = Arc::new(ProcessLauncher::new(config.player.clone()));
    for target in [SurfaceTarget::Video, SurfaceTarget::Page] {
        if !launcher.is_available(target).await {
            warn!(program = launcher.command(target), "player program not found on PATH");
        }
    }

    let players = PlayerContext::new(launcher, config.kiosk.embed_ready_delay());
    let (controller, events) =
        Controller::new(KioskSettings::from(&config.kiosk), players, sink);
    let tx = controller.sender();
    let view = controller.subscribe();

    let poller = source::spawn_poller(
        ListSource::from_config(&config),
        config.source.poll_interval(),
        tx.clone(),
    );
    let controller_task = tokio::spawn(controller.run(events));
    info!(headless, "kiosk started");

    let result = if headless {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")
    } else {
        run_tui(view, tx.clone(), metrics.clone()).await
    };

    poller.abort();
    let _ = tx.send(ControlEvent::Shutdown);
    drop(tx);
    let _ = controller_task.await;
    // The controller owned the last sink, so the worker drains and exits
    let _ = tokio::time::timeout(Duration::from_secs(2), telemetry_task).await;

    let snap = metrics.snapshot();
    info!(
        telemetry = snap.telemetry_total,
        load = snap.load_total,
        ready = snap.ready_total,
        skip = snap.skip_total,
        error = snap.error_total,
        "kiosk stopped"
    );

    result
}

// =============================================================================
// TUI Mode
// =============================================================================

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(
    view: watch::Receiver<KioskView>,
    tx: mpsc::UnboundedSender<ControlEvent>,
    metrics: Arc<Metrics>,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut app = App::new();

    let result = run_event_loop(&mut terminal, &mut app, view, tx, metrics).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Redraws on every tick so the offline countdown keeps moving
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    view: watch::Receiver<KioskView>,
    tx: mpsc::UnboundedSender<ControlEvent>,
    metrics: Arc<Metrics>,
) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(100);

    while app.running {
        app.set_view(view.borrow().clone());
        app.set_metrics(metrics.snapshot());

        let now = tokio::time::Instant::now();
        terminal.draw(|frame| ui::render(frame, app, now))?;

        let key = tokio::task::block_in_place(|| -> Result<_> {
            if event::poll(TICK_RATE)? {
                if let Event::Key(key) = event::read()? {
                    // Only handle key press events (ignore releases on Windows)
                    if key.kind == KeyEventKind::Press {
                        return Ok(Some(key));
                    }
                }
            }
            Ok(None)
        })?;

        if let Some(key) = key {
            if let Some(KeyAction::SkipNow) = app.handle_key(key) {
                let _ = tx.send(ControlEvent::SkipNow);
            }
        }
    }

    Ok(())
}
