//! Output formatting module
//!
//! Handles:
//! - Human-readable rendering of status, latest video and prune results
//! - JSON rendering of the same views for scripting

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write;

use crate::models::{CleanupReport, ControllerState, LatestVideo, ObsVersion, ReplayBufferState};

/// Everything `status` reports
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub installed: bool,
    pub process_running: bool,
    pub socket_connected: bool,
    pub replay_buffer: Option<ReplayBufferState>,
    pub version: Option<ObsVersion>,
    pub output_dir: String,
    pub folder_bytes: u64,
    pub max_folder_bytes: u64,
}

impl StatusReport {
    pub fn new(state: ControllerState, installed: bool, output_dir: String) -> Self {
        Self {
            installed,
            process_running: state.process_running,
            socket_connected: state.socket_connected,
            replay_buffer: None,
            version: None,
            output_dir,
            folder_bytes: 0,
            max_folder_bytes: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct LatestView {
    path: Option<String>,
    modified: Option<String>,
}

#[derive(Debug, Serialize)]
struct PruneView {
    deleted: Vec<String>,
    failed: Vec<String>,
    freed_bytes: u64,
    remaining_bytes: u64,
    within_limit: bool,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn format_status_human(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "OBS installed:      {}", yes_no(report.installed));
    let _ = writeln!(out, "OBS running:        {}", yes_no(report.process_running));
    let socket = if report.socket_connected {
        "connected"
    } else {
        "not connected"
    };
    let _ = writeln!(out, "WebSocket:          {}", socket);
    if let Some(version) = &report.version {
        let _ = writeln!(
            out,
            "OBS version:        {} (obs-websocket {})",
            version.obs_version, version.obs_web_socket_version
        );
    }
    match report.replay_buffer {
        Some(ReplayBufferState::Active) => {
            let _ = writeln!(out, "Replay buffer:      active");
        }
        Some(ReplayBufferState::Inactive) => {
            let _ = writeln!(out, "Replay buffer:      inactive");
        }
        None => {
            let _ = writeln!(out, "Replay buffer:      unknown");
        }
    }
    let _ = writeln!(out, "Output folder:      {}", report.output_dir);
    let _ = writeln!(
        out,
        "Folder size:        {} of {}",
        format_bytes(report.folder_bytes),
        format_bytes(report.max_folder_bytes)
    );
    out
}

pub fn format_latest_human(latest: &LatestVideo) -> String {
    match (&latest.path, latest.modified_display()) {
        (Some(path), Some(modified)) => format!("{}\nModified: {}\n", path.display(), modified),
        (Some(path), None) => format!("{}\n", path.display()),
        _ => "No videos found.\n".to_string(),
    }
}

pub fn format_latest_json(latest: &LatestVideo) -> Result<String> {
    let view = LatestView {
        path: latest.path.as_ref().map(|path| path.display().to_string()),
        modified: latest.modified_display(),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

pub fn format_prune_human(report: Option<&CleanupReport>, max_folder_bytes: u64) -> String {
    let Some(report) = report else {
        return format!(
            "Output folder is within the limit of {}.\n",
            format_bytes(max_folder_bytes)
        );
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Deleted {} file(s), freed {}:",
        report.deleted.len(),
        format_bytes(report.freed_bytes)
    );
    for video in &report.deleted {
        let _ = writeln!(out, "  {}", video.path.display());
    }
    if !report.failed.is_empty() {
        let _ = writeln!(out, "Could not delete {} file(s):", report.failed.len());
        for path in &report.failed {
            let _ = writeln!(out, "  {}", path.display());
        }
    }
    let _ = writeln!(out, "Remaining: {}", format_bytes(report.remaining_bytes));
    if !report.within_limit {
        let _ = writeln!(
            out,
            "Warning: still over the limit of {}",
            format_bytes(max_folder_bytes)
        );
    }
    out
}

pub fn format_prune_json(report: Option<&CleanupReport>, current_bytes: u64) -> Result<String> {
    let view = match report {
        Some(report) => PruneView {
            deleted: report.deleted.iter().map(|v| v.path.display().to_string()).collect(),
            failed: report.failed.iter().map(|p| p.display().to_string()).collect(),
            freed_bytes: report.freed_bytes,
            remaining_bytes: report.remaining_bytes,
            within_limit: report.within_limit,
        },
        None => PruneView {
            deleted: Vec::new(),
            failed: Vec::new(),
            freed_bytes: 0,
            remaining_bytes: current_bytes,
            within_limit: true,
        },
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

pub fn format_status_json(report: &StatusReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Binary units with one decimal, e.g. `1.5 GiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
