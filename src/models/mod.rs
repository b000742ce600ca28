//! Data models module
//!
//! Defines core data structures:
//! - RetentionConfig: which files count towards the folder budget
//! - VideoFileRecord: a matching file discovered in the output directory
//! - LatestVideo: newest matching file, or absent
//! - CleanupReport: outcome of one retention pass
//! - ControllerState / ReplayBufferState: observed controller and OBS state

use chrono::{DateTime, Local};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// obs-websocket endpoint and credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

/// Resolved OBS file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsPaths {
    /// Full path to the OBS executable
    pub executable: PathBuf,
    /// OBS global settings file holding the `[OBSWebSocket]` section
    pub global_ini: PathBuf,
    /// Directory containing one directory per OBS profile
    pub profiles_dir: PathBuf,
}

/// Bounded wait windows for replay verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayTiming {
    /// How long to wait for a saved replay file to appear
    pub save_timeout: Duration,
    /// Delay between verification polls
    pub poll_interval: Duration,
    /// How long to wait for a started buffer to report active
    pub start_verify_timeout: Duration,
}

/// Retention budget for one output directory. Immutable after construction.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    directory: PathBuf,
    extension: String,
    max_total_bytes: u64,
    pattern: Pattern,
}

impl RetentionConfig {
    /// `extension` is accepted with or without a leading dot
    pub fn new(directory: impl Into<PathBuf>, extension: &str, max_total_bytes: u64) -> Self {
        let extension = extension.trim().trim_start_matches('.').to_string();
        let pattern = Pattern::new(&format!("*.{}", Pattern::escape(&extension)))
            .unwrap_or_default();
        Self {
            directory: directory.into(),
            extension,
            max_total_bytes,
            pattern,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn max_total_bytes(&self) -> u64 {
        self.max_total_bytes
    }

    /// Whether a file name carries the configured extension (case-insensitive).
    /// Dotfiles and names that are not valid UTF-8 are included.
    pub fn matches(&self, path: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        path.file_name()
            .map(|name| self.pattern.matches_with(&name.to_string_lossy(), options))
            .unwrap_or(false)
    }
}

/// A matching file in the output directory, derived per scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// Newest matching video, absent when the directory has none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestVideo {
    pub path: Option<PathBuf>,
    pub modified: Option<SystemTime>,
}

impl LatestVideo {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.path.is_none()
    }

    /// Local modification time as `YYYY-MM-DD HH:MM:SS`
    pub fn modified_display(&self) -> Option<String> {
        self.modified.map(|time| {
            DateTime::<Local>::from(time)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
    }
}

impl From<VideoFileRecord> for LatestVideo {
    fn from(record: VideoFileRecord) -> Self {
        Self {
            path: Some(record.path),
            modified: Some(record.modified),
        }
    }
}

/// Outcome of one retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed, oldest first
    pub deleted: Vec<VideoFileRecord>,
    /// Files whose removal failed and were skipped
    pub failed: Vec<PathBuf>,
    pub freed_bytes: u64,
    pub remaining_bytes: u64,
    pub within_limit: bool,
}

/// Replay buffer state as reported by OBS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayBufferState {
    Inactive,
    Active,
}

impl ReplayBufferState {
    pub fn from_active(active: bool) -> Self {
        if active {
            ReplayBufferState::Active
        } else {
            ReplayBufferState::Inactive
        }
    }
}

/// Snapshot of the controller's view of OBS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerState {
    pub process_running: bool,
    pub socket_connected: bool,
}

/// Versions reported by `GetVersion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsVersion {
    pub obs_version: String,
    pub obs_web_socket_version: String,
    #[serde(default)]
    pub rpc_version: u32,
    #[serde(default)]
    pub platform: Option<String>,
}
