//! Configuration management
//!
//! Handles TOML configuration parsing, defaults and validation. Every section
//! is optional; missing keys fall back to the defaults in `constants.rs`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    platform, APP_NAME, CHECK_INTERVAL_MAX, CHECK_INTERVAL_MIN, CONFIG_FILE_NAME,
    DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_MAX_FOLDER_BYTES,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PORT, DEFAULT_PROFILE_NAME, DEFAULT_SAVE_TIMEOUT_SECS,
    DEFAULT_START_VERIFY_TIMEOUT_SECS, DEFAULT_VIDEO_EXTENSION, POLL_INTERVAL_MAX,
    POLL_INTERVAL_MIN, SAVE_TIMEOUT_MAX, SAVE_TIMEOUT_MIN,
};
use crate::models::{ConnectionSettings, ObsPaths, ReplayTiming, RetentionConfig};

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid port: 0 is not a usable obs-websocket port")]
    InvalidPort,

    /// Note: bounds must match the *_MIN/*_MAX values in constants.rs
    #[error("Invalid {field}: {value}. Must be between {min} and {max} seconds")]
    InvalidInterval {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid {0}: must not be empty")]
    EmptyField(&'static str),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub connection: ConnectionConfig,
    pub obs: ObsConfig,
    pub replay: ReplayConfig,
    pub retention: RetentionSettings,
    pub daemon: DaemonSettings,
}

/// obs-websocket endpoint and credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Empty means OBS runs without authentication
    pub password: String,
}

/// Where OBS lives and how it is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsConfig {
    /// OBS installation root
    pub install_dir: PathBuf,
    /// Executable path relative to `install_dir`
    pub executable: PathBuf,
    /// Process name as reported by the OS
    pub process_name: String,
    /// OBS settings root (`obs-studio` under the user config dir when unset)
    pub config_dir: Option<PathBuf>,
    /// Profile written by `setup` and passed at launch
    pub profile_name: String,
}

/// Replay output and verification timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub output_dir: PathBuf,
    pub extension: String,
    pub save_timeout_secs: f64,
    pub poll_interval_secs: f64,
    pub start_verify_timeout_secs: f64,
}

/// Folder size budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub max_folder_bytes: u64,
}

/// Background loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub check_interval_secs: f64,
    /// Launch OBS when it is not running
    pub launch_obs: bool,
    /// Keep the replay buffer active
    pub start_replay_buffer: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: String::new(),
        }
    }
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(platform::OBS_INSTALL_DIR),
            executable: PathBuf::from(platform::OBS_EXECUTABLE),
            process_name: platform::OBS_PROCESS_NAME.to_string(),
            config_dir: None,
            profile_name: DEFAULT_PROFILE_NAME.to_string(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            extension: DEFAULT_VIDEO_EXTENSION.to_string(),
            save_timeout_secs: DEFAULT_SAVE_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            start_verify_timeout_secs: DEFAULT_START_VERIFY_TIMEOUT_SECS,
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_folder_bytes: DEFAULT_MAX_FOLDER_BYTES,
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            launch_obs: true,
            start_replay_buffer: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
        .unwrap_or_else(|| PathBuf::from("Videos"))
}

impl ControllerConfig {
    /// Default location: `<user config dir>/obs-replay/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ControllerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit path, else the default path when it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Ok(default_path) if default_path.exists() => Self::load_from_file(&default_path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.connection.host.trim().is_empty() {
            return Err(ConfigError::EmptyField("connection.host"));
        }
        if self.obs.process_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("obs.process_name"));
        }
        if self.obs.profile_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("obs.profile_name"));
        }
        if self.replay.extension.trim_start_matches('.').trim().is_empty() {
            return Err(ConfigError::EmptyField("replay.extension"));
        }
        check_interval(
            "replay.poll_interval_secs",
            self.replay.poll_interval_secs,
            POLL_INTERVAL_MIN,
            POLL_INTERVAL_MAX,
        )?;
        check_interval(
            "replay.save_timeout_secs",
            self.replay.save_timeout_secs,
            SAVE_TIMEOUT_MIN,
            SAVE_TIMEOUT_MAX,
        )?;
        check_interval(
            "replay.start_verify_timeout_secs",
            self.replay.start_verify_timeout_secs,
            0.0,
            SAVE_TIMEOUT_MAX,
        )?;
        check_interval(
            "daemon.check_interval_secs",
            self.daemon.check_interval_secs,
            CHECK_INTERVAL_MIN,
            CHECK_INTERVAL_MAX,
        )?;
        Ok(())
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            host: self.connection.host.clone(),
            port: self.connection.port,
            password: Some(self.connection.password.clone()).filter(|p| !p.is_empty()),
        }
    }

    pub fn retention_config(&self) -> RetentionConfig {
        RetentionConfig::new(
            self.replay.output_dir.clone(),
            &self.replay.extension,
            self.retention.max_folder_bytes,
        )
    }

    pub fn replay_timing(&self) -> ReplayTiming {
        ReplayTiming {
            save_timeout: Duration::from_secs_f64(self.replay.save_timeout_secs),
            poll_interval: Duration::from_secs_f64(self.replay.poll_interval_secs),
            start_verify_timeout: Duration::from_secs_f64(self.replay.start_verify_timeout_secs),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs_f64(self.daemon.check_interval_secs)
    }

    /// Resolve OBS file locations from the configured roots
    pub fn obs_paths(&self) -> ObsPaths {
        let config_root = self.obs.config_dir.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("obs-studio")
        });
        ObsPaths {
            executable: self.obs.install_dir.join(&self.obs.executable),
            global_ini: config_root.join("global.ini"),
            profiles_dir: config_root.join("basic").join("profiles"),
        }
    }
}

fn check_interval(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::InvalidInterval {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection.port, 4455);
        assert_eq!(config.replay.extension, "mp4");
        assert_eq!(config.retention.max_folder_bytes, 5 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[connection]
password = "hunter22"

[retention]
max_folder_bytes = 1024
"#,
        )
        .unwrap();

        let config = ControllerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.connection.password, "hunter22");
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.retention.max_folder_bytes, 1024);
        assert_eq!(config.replay.poll_interval_secs, 1.0);
    }

    #[test]
    fn test_port_zero_rejected() {
        let mut config = ControllerConfig::default();
        config.connection.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = ControllerConfig::default();
        config.replay.poll_interval_secs = 0.05;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("replay.poll_interval_secs"));

        config.replay.poll_interval_secs = 61.0;
        assert!(config.validate().is_err());

        config.replay.poll_interval_secs = 0.1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_extension_rejected() {
        let mut config = ControllerConfig::default();
        config.replay.extension = ".".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("replay.extension"))
        ));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[connection\nport = ").unwrap();

        let err = ControllerConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_empty_password_means_no_auth() {
        let config = ControllerConfig::default();
        assert!(config.connection_settings().password.is_none());
    }

    #[test]
    fn test_obs_paths_follow_config_dir() {
        let mut config = ControllerConfig::default();
        config.obs.config_dir = Some(PathBuf::from("/tmp/obs-studio"));
        let paths = config.obs_paths();
        assert_eq!(paths.global_ini, PathBuf::from("/tmp/obs-studio/global.ini"));
        assert_eq!(
            paths.profiles_dir,
            PathBuf::from("/tmp/obs-studio/basic/profiles")
        );
    }
}
