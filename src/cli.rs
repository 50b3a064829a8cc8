//! CLI - Command Line Interface for camkiosk
//!
//! Running without a subcommand (or with `run`) starts the kiosk. The other
//! subcommands manage the stream list and are scriptable: output is JSON
//! when `--json` is given or stdout is not a terminal.
//!
//! # Examples
//!
//! ```bash
//! camkiosk                                   # kiosk with terminal surface
//! camkiosk run --headless                    # kiosk without TUI, until Ctrl-C
//! camkiosk add osprey "Osprey Nest" embedded https://www.youtube.com/embed/xyz --dwell 60
//! camkiosk list --health --json
//! camkiosk check
//! ```

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::StreamKind;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// General error
    Error = 1,
    InvalidArgs = 2,
    NetworkError = 3,
    /// Stream id not in the list
    NotFound = 4,
    /// Empty list, or a health check found streams down
    NoStreams = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// camkiosk - unattended camera stream kiosk
///
/// Run without arguments to start the kiosk with its terminal surface.
#[derive(Parser, Debug)]
#[command(
    name = "camkiosk",
    version,
    about = "Unattended kiosk cycling through live camera streams",
    long_about = "Cycles through a list of live camera streams, detects streams \
                  that never start or fail mid-playback, and moves on.\n\n\
                  Run without arguments to start the kiosk.\n\
                  Use subcommands to manage the stream list.",
    after_help = "EXAMPLES:\n\
                  camkiosk                                 Start the kiosk\n\
                  camkiosk run --headless                  Start without the TUI\n\
                  camkiosk add feeder Feeder hls URL       Add a stream\n\
                  camkiosk check --json                    Probe every stream"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run (omit to start the kiosk)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Management subcommand rather than the kiosk itself
    pub fn is_cli_mode(&self) -> bool {
        !matches!(self.command, None | Some(Command::Run(_)))
    }

    /// Kiosk without the terminal surface
    pub fn is_headless(&self) -> bool {
        matches!(&self.command, Some(Command::Run(cmd)) if cmd.headless)
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the kiosk
    Run(RunCmd),

    /// Show the configured streams
    #[command(visible_alias = "ls")]
    List(ListCmd),

    /// Add a stream, or replace the one with the same id
    Add(AddCmd),

    /// Remove a stream by id
    #[command(visible_alias = "rm")]
    Remove(RemoveCmd),

    /// Probe every stream for reachability
    Check(CheckCmd),

    /// Print the effective configuration
    Config(ConfigCmd),
}

#[derive(Args, Debug, Default)]
pub struct RunCmd {
    /// Run without the terminal surface until Ctrl-C
    #[arg(long)]
    pub headless: bool,
}

#[derive(Args, Debug)]
pub struct ListCmd {
    /// Probe each stream and include its health
    #[arg(long)]
    pub health: bool,
}

#[derive(Args, Debug)]
pub struct AddCmd {
    /// Stable identifier, unique within the list
    pub id: String,

    /// Display name
    pub name: String,

    /// embedded (youtube), adaptive (hls) or page (web)
    pub kind: StreamKind,

    pub url: String,

    /// Seconds to show this stream before rotating
    #[arg(long, short = 'd')]
    pub dwell: Option<u64>,

    /// Credit line shown on the overlay
    #[arg(long, short = 'a')]
    pub attribution: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveCmd {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CheckCmd {}

#[derive(Args, Debug)]
pub struct ConfigCmd {
    /// Write the effective config to the config file
    #[arg(long)]
    pub write: bool,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Envelope for `--json` output
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }
}

impl JsonOutput<()> {
    pub fn failure(msg: impl Into<String>, code: ExitCode) -> Self {
        Self {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Result of a list mutation
#[derive(Debug, Serialize)]
pub struct Mutation {
    pub ok: bool,
    pub count: usize,
}

// =============================================================================
// Output Helper
// =============================================================================

pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print data, wrapped in the JSON envelope in JSON mode
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&JsonOutput::success(data))?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print a plain line (human mode only)
    pub fn line(&self, msg: impl std::fmt::Display) {
        if !self.json {
            println!("{}", msg);
        }
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            if let Ok(json) = serde_json::to_string_pretty(&JsonOutput::failure(&msg, code)) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
