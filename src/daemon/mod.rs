//! Daemon loop
//!
//! Keeps OBS running, the replay buffer active and the output folder within
//! budget. Each tick walks those steps in order; failures that a later tick
//! can recover from are logged and absorbed, while configuration and host
//! environment errors stop the loop.

pub mod logging;

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::ControllerConfig;
use crate::controller::ObsController;
use crate::error::ControllerError;
use crate::models::{CleanupReport, ReplayBufferState};
use logging::DaemonLogger;

const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub check_interval: Duration,
    pub launch_obs: bool,
    pub start_replay_buffer: bool,
    /// Stop after this many ticks; runs until interrupted when unset
    pub max_ticks: Option<u64>,
    /// Reported in the startup event
    pub config_path: Option<PathBuf>,
}

impl DaemonOptions {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            launch_obs: config.daemon.launch_obs,
            start_replay_buffer: config.daemon.start_replay_buffer,
            max_ticks: None,
            config_path: None,
        }
    }
}

/// What one tick observed and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub process_running: bool,
    pub launched: bool,
    pub connected: bool,
    pub replay_active: bool,
    pub cleanup: Option<CleanupReport>,
}

/// Run ticks until `interrupted` is set or `max_ticks` is reached, then clean
/// up. Returns the number of completed ticks.
pub fn run(
    controller: &mut ObsController,
    options: &DaemonOptions,
    interrupted: &AtomicBool,
) -> Result<u64, ControllerError> {
    let logger = DaemonLogger::default();
    logger.log_startup(options.config_path.as_deref(), std::process::id());

    let mut ticks = 0u64;
    let outcome = loop {
        if interrupted.load(Ordering::Relaxed) {
            break Ok("interrupted");
        }
        if let Err(err) = run_once(controller, options, &logger) {
            logger.log_error(&err.to_string(), Some("daemon tick"));
            break Err(err);
        }
        ticks += 1;
        if options.max_ticks.is_some_and(|max| ticks >= max) {
            break Ok("tick limit reached");
        }
        sleep_unless_interrupted(options.check_interval, interrupted);
    };

    let reason = match &outcome {
        Ok(reason) => *reason,
        Err(_) => "fatal error",
    };
    logger.log_shutdown(reason, ticks);
    controller.cleanup();
    outcome.map(|_| ticks)
}

/// One pass over launch, connect, replay buffer and retention
pub fn run_once(
    controller: &mut ObsController,
    options: &DaemonOptions,
    logger: &DaemonLogger,
) -> Result<TickReport, ControllerError> {
    let mut report = TickReport {
        process_running: controller.is_process_running()?,
        ..TickReport::default()
    };

    if !report.process_running {
        if controller.is_connected() {
            info!("OBS is no longer running; dropping the stale connection");
            controller.disconnect();
        }
        if options.launch_obs {
            // OBS needs time to bring up its websocket; connect next tick
            report.launched = absorb("Launching OBS", controller.launch_obs())?.is_some();
        } else {
            warn!("OBS is not running and launching is disabled");
        }
    } else {
        report.connected = ensure_connected(controller)?;
    }

    if report.connected && options.start_replay_buffer {
        report.replay_active = ensure_replay_buffer(controller, logger)?;
    }

    report.cleanup = controller.check_and_manage_folder_size();
    if let Some(cleanup) = &report.cleanup {
        logger.log_folder_pruned(controller.retention().config().directory(), cleanup);
    }

    debug!("Tick finished: {:?}", report);
    Ok(report)
}

fn ensure_connected(controller: &mut ObsController) -> Result<bool, ControllerError> {
    if controller.is_connected() {
        if absorb("Health check", controller.health_check())?.unwrap_or(false) {
            return Ok(true);
        }
        warn!("OBS WebSocket health check failed; reconnecting");
    }
    Ok(absorb("Connecting to OBS", controller.connect())?.unwrap_or(false))
}

fn ensure_replay_buffer(
    controller: &mut ObsController,
    logger: &DaemonLogger,
) -> Result<bool, ControllerError> {
    let status = absorb("Querying replay buffer", controller.replay_buffer_status())?.flatten();
    if status == Some(ReplayBufferState::Active) {
        return Ok(true);
    }
    let started = absorb("Starting replay buffer", controller.start_replay_buffer())?
        .unwrap_or(false);
    if started {
        logger.log_replay_started();
    }
    Ok(started)
}

/// Keep fatal errors, log the rest and carry on with `None`
fn absorb<T>(step: &str, result: Result<T, ControllerError>) -> Result<Option<T>, ControllerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (ControllerError::Configuration(_) | ControllerError::Environment(_))) => {
            Err(err)
        }
        Err(err) => {
            warn!("{} failed: {}", step, err);
            Ok(None)
        }
    }
}

fn sleep_unless_interrupted(duration: Duration, interrupted: &AtomicBool) {
    let mut remaining = duration;
    while !remaining.is_zero() && !interrupted.load(Ordering::Relaxed) {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_absorb_keeps_fatal_errors() {
        let fatal: Result<(), _> = Err(ControllerError::Environment("x".to_string()));
        assert!(absorb("step", fatal).is_err());

        let config: Result<(), _> = Err(ControllerError::Configuration("x".to_string()));
        assert!(absorb("step", config).is_err());
    }

    #[test]
    fn test_absorb_swallows_transient_errors() {
        let transient: Result<bool, _> = Err(ControllerError::NotConnected);
        assert_eq!(absorb("step", transient).unwrap(), None);

        let gone: Result<bool, _> = Err(ControllerError::ProcessNotRunning("obs".to_string()));
        assert_eq!(absorb("step", gone).unwrap(), None);

        assert_eq!(absorb("step", Ok(true)).unwrap(), Some(true));
    }

    #[test]
    fn test_sleep_returns_early_when_interrupted() {
        let interrupted = AtomicBool::new(true);
        let started = Instant::now();
        sleep_unless_interrupted(Duration::from_secs(30), &interrupted);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = ControllerConfig::default();
        config.daemon.check_interval_secs = 5.0;
        config.daemon.launch_obs = false;
        let options = DaemonOptions::from_config(&config);
        assert_eq!(options.check_interval, Duration::from_secs(5));
        assert!(!options.launch_obs);
        assert!(options.start_replay_buffer);
        assert_eq!(options.max_ticks, None);
    }
}
