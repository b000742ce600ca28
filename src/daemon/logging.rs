//! Structured lifecycle events for the daemon loop
//!
//! Each event is a `log` record of the form `message | {json}` so it stays
//! readable in plain logs and greppable by its `event` field.

use log::{error, info};
use serde_json::{json, Value};
use std::path::Path;

use crate::constants::{
    EVENT_DAEMON_SHUTDOWN, EVENT_DAEMON_STARTUP, EVENT_FOLDER_PRUNED, EVENT_REPLAY_STARTED,
};
use crate::models::CleanupReport;

#[derive(Debug, Clone)]
pub struct DaemonLogger {
    level: LogLevel,
}

/// Log levels for daemon events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Info,
}

impl Default for DaemonLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl DaemonLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn log_startup(&self, config_path: Option<&Path>, pid: u32) {
        let data = json!({
            "event": EVENT_DAEMON_STARTUP,
            "pid": pid,
            "config_path": config_path.map(|path| path.display().to_string()),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log_structured(LogLevel::Info, "Daemon started", &data);
    }

    pub fn log_shutdown(&self, reason: &str, ticks: u64) {
        let data = json!({
            "event": EVENT_DAEMON_SHUTDOWN,
            "reason": reason,
            "ticks": ticks,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log_structured(LogLevel::Info, "Daemon shutting down", &data);
    }

    pub fn log_replay_started(&self) {
        let data = json!({
            "event": EVENT_REPLAY_STARTED,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log_structured(LogLevel::Info, "Replay buffer active", &data);
    }

    pub fn log_folder_pruned(&self, directory: &Path, report: &CleanupReport) {
        let data = json!({
            "event": EVENT_FOLDER_PRUNED,
            "directory": directory.display().to_string(),
            "deleted": report.deleted.len(),
            "failed": report.failed.len(),
            "freed_bytes": report.freed_bytes,
            "remaining_bytes": report.remaining_bytes,
            "within_limit": report.within_limit,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let level = if report.failed.is_empty() {
            LogLevel::Info
        } else {
            LogLevel::Error
        };
        self.log_structured(level, "Output folder pruned", &data);
    }

    pub fn log_error(&self, message: &str, context: Option<&str>) {
        let data = json!({
            "event": "error",
            "message": message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.log_structured(LogLevel::Error, message, &data);
    }

    fn log_structured(&self, level: LogLevel, message: &str, data: &Value) {
        if !self.should_log(level) {
            return;
        }
        let line = format_event(message, data);
        match level {
            LogLevel::Error => error!("{}", line),
            LogLevel::Info => info!("{}", line),
        }
    }

    fn should_log(&self, level: LogLevel) -> bool {
        matches!(
            (self.level, level),
            (LogLevel::Error, LogLevel::Error) | (LogLevel::Info, _)
        )
    }
}

fn format_event(message: &str, data: &Value) -> String {
    format!("{} | {}", message, data)
}
