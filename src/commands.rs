//! CLI Command Handlers
//!
//! Stream list management. Each handler takes its CLI args, the effective
//! config and the Output helper, and returns an ExitCode.

use serde::Serialize;

use crate::cli::{AddCmd, CheckCmd, ConfigCmd, ExitCode, ListCmd, Mutation, Output, RemoveCmd};
use crate::config::Config;
use crate::models::{StreamDescriptor, StreamList};
use crate::source::{CamStore, HealthProber, ListSource, StoreError};

// =============================================================================
// List Command
// =============================================================================

pub async fn list_cmd(cmd: ListCmd, config: &Config, output: &Output) -> ExitCode {
    let source = match &config.source.url {
        Some(url) => ListSource::http(url.clone()),
        None => {
            let prober = cmd.health.then(|| prober(config));
            ListSource::file(CamStore::new(config.cams_path()), prober)
        }
    };

    let list = match source.fetch().await {
        Ok(list) => list,
        Err(e) => return output.error(format!("{:#}", e), ExitCode::NetworkError),
    };

    if output.json {
        if let Err(e) = output.print(&list) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        print_table(&list, output);
    }

    if list.is_empty() {
        ExitCode::NoStreams
    } else {
        ExitCode::Success
    }
}

fn print_table(list: &StreamList, output: &Output) {
    if list.is_empty() {
        output.info("No streams configured");
        return;
    }
    for (i, s) in list.streams.iter().enumerate() {
        let dwell = s
            .dwell_seconds
            .map(|d| format!("{}s", d))
            .unwrap_or_else(|| "default".to_string());
        let health = match &s.health {
            Some(h) if h.ok => "up".to_string(),
            Some(h) => format!("DOWN ({})", h.detail.as_deref().unwrap_or("offline")),
            None => String::new(),
        };
        output.line(format!(
            "{:>3}  {:<16} {:<9} {:<8} {}  {}",
            i + 1,
            s.id,
            s.kind,
            dwell,
            s.name,
            health
        ));
    }
}

// =============================================================================
// Add / Remove Commands
// =============================================================================

pub fn add_cmd(cmd: AddCmd, config: &Config, output: &Output) -> ExitCode {
    let mut stream = StreamDescriptor::new(cmd.id, cmd.name, cmd.kind, cmd.url);
    stream.dwell_seconds = cmd.dwell;
    stream.attribution = cmd.attribution;

    if let Err(e) = reqwest::Url::parse(&stream.url) {
        return output.error(format!("Invalid URL '{}': {}", stream.url, e), ExitCode::InvalidArgs);
    }

    let store = CamStore::new(config.cams_path());
    let id = stream.id.clone();
    match store.upsert(stream) {
        Ok(list) => {
            output.info(format!("Saved '{}' ({} streams)", id, list.len()));
            report(Mutation { ok: true, count: list.len() }, output)
        }
        Err(e) => store_error(e, output),
    }
}

pub fn remove_cmd(cmd: RemoveCmd, config: &Config, output: &Output) -> ExitCode {
    let store = CamStore::new(config.cams_path());
    match store.delete(&cmd.id) {
        Ok(list) => {
            output.info(format!("Removed '{}' ({} streams left)", cmd.id, list.len()));
            report(Mutation { ok: true, count: list.len() }, output)
        }
        Err(e) => store_error(e, output),
    }
}

fn store_error(e: StoreError, output: &Output) -> ExitCode {
    let code = match e {
        StoreError::NotFound(_) => ExitCode::NotFound,
        StoreError::Invalid(_) => ExitCode::InvalidArgs,
        StoreError::Io { .. } | StoreError::Encode(_) => ExitCode::Error,
    };
    output.error(e.to_string(), code)
}

fn report<T: Serialize>(data: T, output: &Output) -> ExitCode {
    if output.json {
        if let Err(e) = output.print(data) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    }
    ExitCode::Success
}

// =============================================================================
// Check Command
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub id: String,
    pub ok: bool,
    pub detail: Option<String>,
}

/// Probe every stream; exits non-zero if any is down
pub async fn check_cmd(_cmd: CheckCmd, config: &Config, output: &Output) -> ExitCode {
    let list = match &config.source.url {
        Some(url) => ListSource::http(url.clone()).load().await,
        None => CamStore::new(config.cams_path()).read(),
    };
    if list.is_empty() {
        return output.error("No streams configured", ExitCode::NoStreams);
    }

    output.info(format!("Probing {} streams...", list.len()));
    let checked = prober(config).annotate(list).await;

    let reports: Vec<CheckReport> = checked
        .streams
        .iter()
        .map(|s| CheckReport {
            id: s.id.clone(),
            ok: s.health.as_ref().is_some_and(|h| h.ok),
            detail: s.health.as_ref().and_then(|h| h.detail.clone()),
        })
        .collect();
    let down = reports.iter().filter(|r| !r.ok).count();

    if output.json {
        if let Err(e) = output.print(&reports) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        for r in &reports {
            let mark = if r.ok { "ok  " } else { "DOWN" };
            output.line(format!("{} {:<16} {}", mark, r.id, r.detail.as_deref().unwrap_or("")));
        }
    }

    if down > 0 {
        output.info(format!("{} of {} streams down", down, reports.len()));
        ExitCode::NetworkError
    } else {
        ExitCode::Success
    }
}

fn prober(config: &Config) -> HealthProber {
    HealthProber::new(config.source.health_ttl(), config.source.probe_timeout())
}

// =============================================================================
// Config Command
// =============================================================================

pub fn config_cmd(cmd: ConfigCmd, config: &Config, path: Option<&std::path::Path>, output: &Output) -> ExitCode {
    if cmd.write {
        let Some(target) = path.map(|p| p.to_path_buf()).or_else(Config::path) else {
            return output.error("No config directory available", ExitCode::Error);
        };
        if let Err(e) = config.save_to(&target) {
            return output.error(format!("Failed to write {}: {:#}", target.display(), e), ExitCode::Error);
        }
        output.info(format!("Wrote {}", target.display()));
        return ExitCode::Success;
    }

    if output.json {
        if let Err(e) = output.print(config) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
        return ExitCode::Success;
    }

    match toml::to_string_pretty(config) {
        Ok(text) => {
            output.line(text);
            ExitCode::Success
        }
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}
