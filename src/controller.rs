//! Controller facade
//!
//! `ObsController` ties the process guard, connection guard, replay
//! controller, retention manager and bootstrap helpers to one configuration.
//! Remote operations check their preconditions at entry and fail before any
//! I/O. Dropping the controller disconnects and stops any OBS it launched.

use log::{debug, info, warn};

use crate::bootstrap::{self, Launcher};
use crate::config::ControllerConfig;
use crate::connection::ConnectionGuard;
use crate::error::ControllerError;
use crate::models::{
    CleanupReport, ControllerState, LatestVideo, ObsPaths, ObsVersion, ReplayBufferState,
};
use crate::process::{ProcessProbe, SysinfoProbe};
use crate::replay::ReplayController;
use crate::retention::RetentionManager;
use crate::websocket::{Connector, WsConnector};

pub struct ObsController {
    config: ControllerConfig,
    paths: ObsPaths,
    probe: Box<dyn ProcessProbe>,
    connection: ConnectionGuard,
    replay: ReplayController,
    retention: RetentionManager,
    launcher: Launcher,
}

impl ObsController {
    /// Controller for the local host: sysinfo process probe and a real
    /// websocket connector
    pub fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        Self::with_parts(config, Box::new(SysinfoProbe), Box::new(WsConnector::default()))
    }

    /// Controller with caller-supplied process probe and connector
    pub fn with_parts(
        config: ControllerConfig,
        probe: Box<dyn ProcessProbe>,
        connector: Box<dyn Connector>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let paths = config.obs_paths();
        let connection = ConnectionGuard::new(config.connection_settings(), connector);
        let replay = ReplayController::new(config.replay_timing());
        let retention = RetentionManager::new(config.retention_config());
        debug!(
            "Controller configured for {}:{} (output {})",
            config.connection.host,
            config.connection.port,
            config.replay.output_dir.display()
        );
        Ok(Self {
            config,
            paths,
            probe,
            connection,
            replay,
            retention,
            launcher: Launcher::new(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn paths(&self) -> &ObsPaths {
        &self.paths
    }

    pub fn retention(&self) -> &RetentionManager {
        &self.retention
    }

    // Guards

    pub fn is_process_running(&self) -> Result<bool, ControllerError> {
        self.probe.is_process_running(&self.config.obs.process_name)
    }

    pub fn require_process_running(&self) -> Result<(), ControllerError> {
        if self.is_process_running()? {
            Ok(())
        } else {
            Err(ControllerError::ProcessNotRunning(
                self.config.obs.process_name.clone(),
            ))
        }
    }

    pub fn require_connection(&self) -> Result<(), ControllerError> {
        self.connection.require_connection()
    }

    pub fn state(&self) -> Result<ControllerState, ControllerError> {
        Ok(ControllerState {
            process_running: self.is_process_running()?,
            socket_connected: self.connection.is_connected(),
        })
    }

    // Bootstrap

    pub fn is_obs_installed(&self) -> bool {
        bootstrap::is_obs_installed(&self.paths.executable)
    }

    pub fn enable_websocket(&self) -> Result<bool, ControllerError> {
        bootstrap::enable_websocket(&self.paths.global_ini, self.connection.settings())
    }

    pub fn set_default_profile(&self) -> Result<(), ControllerError> {
        bootstrap::set_default_profile(
            &self.paths.profiles_dir,
            &self.config.obs.profile_name,
            &self.config.replay.output_dir,
        )
    }

    /// Start OBS with the controller profile unless it is already running
    pub fn launch_obs(&mut self) -> Result<(), ControllerError> {
        if self.is_process_running()? {
            info!("OBS is already running.");
            return Ok(());
        }
        if !self.is_obs_installed() {
            return Err(ControllerError::Environment(format!(
                "OBS executable not found at {}",
                self.paths.executable.display()
            )));
        }
        self.launcher
            .launch(&self.paths.executable, &self.config.obs.profile_name)
    }

    /// Let a launched OBS keep running after this controller is dropped
    pub fn release_obs(&mut self) {
        if let Some(pid) = self.launcher.release() {
            debug!("Released OBS process {}", pid);
        }
    }

    // Connection

    pub fn connect(&mut self) -> Result<bool, ControllerError> {
        self.require_process_running()?;
        self.connection.connect()
    }

    pub fn disconnect(&mut self) -> bool {
        self.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn health_check(&mut self) -> Result<bool, ControllerError> {
        self.connection.health_check()
    }

    pub fn get_obs_version(&mut self) -> Result<Option<ObsVersion>, ControllerError> {
        self.connection.get_version()
    }

    // Replay buffer

    pub fn start_replay_buffer(&mut self) -> Result<bool, ControllerError> {
        self.replay.start_replay_buffer(&mut self.connection)
    }

    pub fn stop_replay_buffer(&mut self) -> Result<bool, ControllerError> {
        self.replay.stop_replay_buffer(&mut self.connection)
    }

    pub fn save_replay(&mut self) -> Result<bool, ControllerError> {
        self.replay.save_replay(&mut self.connection, &self.retention)
    }

    pub fn replay_buffer_status(&mut self) -> Result<Option<ReplayBufferState>, ControllerError> {
        self.replay.replay_buffer_status(&mut self.connection)
    }

    // Retention

    pub fn get_latest_video(&self) -> LatestVideo {
        self.retention.get_latest_video()
    }

    pub fn check_and_manage_folder_size(&self) -> Option<CleanupReport> {
        self.retention.check_and_manage_folder_size()
    }

    pub fn cleanup_videos(&self) -> CleanupReport {
        self.retention.cleanup_videos()
    }

    /// Disconnect and stop the OBS process this controller launched.
    /// Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.connection.is_connected() {
            self.connection.disconnect();
        }
        if self.launcher.has_child() {
            self.launcher.terminate();
        } else {
            debug!("No OBS process was running to terminate.");
        }
    }
}

impl Drop for ObsController {
    fn drop(&mut self) {
        if self.connection.is_connected() || self.launcher.has_child() {
            warn!("Controller dropped with live resources; cleaning up");
        }
        self.cleanup();
    }
}

impl std::fmt::Debug for ObsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsController")
            .field("connection", &self.connection)
            .field("paths", &self.paths)
            .field("launched_pid", &self.launcher.child_id())
            .finish()
    }
}
