//! Global constants for obs-replay
//!
//! Centralized location for application-wide constants

/// Application name, used for the config directory and log events
pub const APP_NAME: &str = "obs-replay";

/// Config file name inside the application config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default obs-websocket host
pub const DEFAULT_HOST: &str = "localhost";

/// Default obs-websocket port (obs-websocket 5.x)
pub const DEFAULT_PORT: u16 = 4455;

/// Default upper bound for the output folder (5 GiB)
pub const DEFAULT_MAX_FOLDER_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Default container extension OBS writes replays with
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Default save verification window in seconds
pub const DEFAULT_SAVE_TIMEOUT_SECS: f64 = 300.0;

/// Default poll interval for save/start verification in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;

/// Default window for confirming a started replay buffer in seconds
pub const DEFAULT_START_VERIFY_TIMEOUT_SECS: f64 = 10.0;

/// Default daemon check interval in seconds
pub const DEFAULT_CHECK_INTERVAL_SECS: f64 = 30.0;

/// OBS profile written by `setup` and selected at launch
pub const DEFAULT_PROFILE_NAME: &str = "obs_controller";

/// Poll interval bounds (seconds).
pub const POLL_INTERVAL_MIN: f64 = 0.1;
pub const POLL_INTERVAL_MAX: f64 = 60.0;

/// Save timeout bounds (seconds).
pub const SAVE_TIMEOUT_MIN: f64 = 1.0;
pub const SAVE_TIMEOUT_MAX: f64 = 3600.0;

/// Daemon check interval bounds (seconds).
pub const CHECK_INTERVAL_MIN: f64 = 1.0;
pub const CHECK_INTERVAL_MAX: f64 = 86400.0;

/// Arguments OBS is launched with, followed by `--profile <name>`
pub const OBS_LAUNCH_ARGS: &[&str] = &[
    "--minimize-to-tray",
    "--disable-updater",
    "--disable-shutdown-check",
];

/// Event name used for daemon lifecycle log entries
pub const EVENT_DAEMON_STARTUP: &str = "daemon_startup";
pub const EVENT_DAEMON_SHUTDOWN: &str = "daemon_shutdown";
pub const EVENT_REPLAY_STARTED: &str = "replay_buffer_started";
pub const EVENT_FOLDER_PRUNED: &str = "folder_pruned";

/// Platform defaults for the OBS installation.
#[cfg(target_os = "windows")]
pub mod platform {
    pub const OBS_INSTALL_DIR: &str = "C:/Program Files/obs-studio";
    pub const OBS_EXECUTABLE: &str = "bin/64bit/obs64.exe";
    pub const OBS_PROCESS_NAME: &str = "obs64.exe";
}

#[cfg(target_os = "macos")]
pub mod platform {
    pub const OBS_INSTALL_DIR: &str = "/Applications/OBS.app";
    pub const OBS_EXECUTABLE: &str = "Contents/MacOS/OBS";
    pub const OBS_PROCESS_NAME: &str = "OBS";
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub mod platform {
    pub const OBS_INSTALL_DIR: &str = "/usr";
    pub const OBS_EXECUTABLE: &str = "bin/obs";
    pub const OBS_PROCESS_NAME: &str = "obs";
}
