//! Process launcher - presentation surfaces backed by external programs
//!
//! Video surfaces run mpv (or whatever `player.video_command` names), frames
//! and pages run a kiosk browser. Each child gets its own session so the
//! whole process group can be signalled on release.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Launcher, PlayerError, Surface, SurfaceEvent, SurfaceRequest, SurfaceTarget};
use crate::config::PlayerConfig;

/// Printed by mpv once playback starts
pub const PLAYING_MARKER: &str = "CAMKIOSK_PLAYING";

/// Launches surfaces as child processes
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: PlayerConfig,
}

impl ProcessLauncher {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    /// Program for a surface target
    pub fn command(&self, target: SurfaceTarget) -> &str {
        match target {
            SurfaceTarget::Video => &self.config.video_command,
            SurfaceTarget::Frame | SurfaceTarget::Page => &self.config.browser_command,
        }
    }

    /// Full argument list for a request
    pub fn build_args(&self, request: &SurfaceRequest) -> Vec<String> {
        match request.target {
            SurfaceTarget::Video => {
                let mut args = self.config.video_args.clone();
                args.push(format!("--term-playing-msg={}", PLAYING_MARKER));
                if !request.title.is_empty() {
                    args.push(format!("--title={}", request.title));
                }
                args.push(request.url.clone());
                args
            }
            SurfaceTarget::Frame | SurfaceTarget::Page => {
                let mut args = self.config.browser_args.clone();
                args.push(request.url.clone());
                args
            }
        }
    }

    /// Check if the program for a target is on the system
    pub async fn is_available(&self, target: SurfaceTarget) -> bool {
        let cmd = self.command(target);

        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Launcher for ProcessLauncher {
    fn can_play_type(&self, mime: &str) -> bool {
        self.config
            .native_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }

    fn adaptive_client(&self) -> bool {
        self.config.adaptive_client
    }

    fn open(&self, request: SurfaceRequest) -> Result<Surface, PlayerError> {
        let program = self.command(request.target).to_string();
        let args = self.build_args(&request);
        debug!(program = %program, ?args, "opening surface");

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if request.target == SurfaceTarget::Video {
            cmd.stdout(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
        }

        // Detach from our terminal and lead a new process group
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(program.clone())
            } else {
                PlayerError::StartFailed(e)
            }
        })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = tokio::spawn(watch(child, stdout, tx));

        Ok(Surface::new(rx).on_release(move || {
            if let Some(pid) = pid {
                kill_group(pid);
            }
            // Dropping the child kills it too
            watcher.abort();
        }))
    }
}

async fn watch(
    mut child: Child,
    stdout: Option<ChildStdout>,
    tx: mpsc::UnboundedSender<SurfaceEvent>,
) {
    if let Some(stdout) = stdout {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.contains(PLAYING_MARKER) {
                let _ = tx.send(SurfaceEvent::Playing);
            }
        }
    }

    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "failed to wait for surface process");
            None
        }
    };
    let _ = tx.send(SurfaceEvent::Exited(code));
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pid) = i32::try_from(pid) else {
        return;
    };
    unsafe {
        libc::kill(-pid, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
