//! Replay controller
//!
//! Drives the OBS replay buffer through the connection guard. OBS owns the
//! buffer state; the controller only asks for it. Start is confirmed by
//! polling `GetReplayBufferStatus`, save by watching the output directory
//! for a new file, since the save acknowledgement arrives before the file
//! is written.

use log::{debug, error, info, warn};
use std::thread;
use std::time::{Duration, Instant};

use crate::connection::ConnectionGuard;
use crate::error::ControllerError;
use crate::models::{ReplayBufferState, ReplayTiming};
use crate::retention::RetentionManager;
use crate::websocket::protocol::{request, status};

#[derive(Debug, Clone, Copy)]
pub struct ReplayController {
    timing: ReplayTiming,
}

impl ReplayController {
    pub fn new(timing: ReplayTiming) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> ReplayTiming {
        self.timing
    }

    /// Current buffer state as reported by OBS. `None` when the query failed.
    pub fn replay_buffer_status(
        &self,
        connection: &mut ConnectionGuard,
    ) -> Result<Option<ReplayBufferState>, ControllerError> {
        match connection.call(request::GET_REPLAY_BUFFER_STATUS, None)? {
            Ok(response) if response.is_success() => match response.data_bool("outputActive") {
                Some(active) => Ok(Some(ReplayBufferState::from_active(active))),
                None => {
                    error!("GetReplayBufferStatus response is missing outputActive");
                    Ok(None)
                }
            },
            Ok(response) => {
                warn!("GetReplayBufferStatus rejected: {}", response.describe());
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }

    /// Start the buffer. An already active buffer counts as started.
    pub fn start_replay_buffer(
        &self,
        connection: &mut ConnectionGuard,
    ) -> Result<bool, ControllerError> {
        connection.require_connection()?;
        match connection.call(request::START_REPLAY_BUFFER, None)? {
            Ok(response) if response.is_success() => {}
            Ok(response) if response.code() == status::OUTPUT_RUNNING => {
                info!("Replay buffer is already active.");
                return Ok(true);
            }
            Ok(response) => {
                error!("Failed to start replay buffer: {}", response.describe());
                return Ok(false);
            }
            Err(err) => {
                error!("Failed to start replay buffer: {}", err);
                return Ok(false);
            }
        }

        let mut connection_lost = false;
        let confirmed = poll_until(
            self.timing.start_verify_timeout,
            self.timing.poll_interval,
            || {
                // Stop polling once a failed status query dropped the session
                if !connection.is_connected() {
                    connection_lost = true;
                    return Ok(true);
                }
                Ok(self.replay_buffer_status(connection)? == Some(ReplayBufferState::Active))
            },
        )?;
        if connection_lost {
            error!("Lost the OBS WebSocket connection while confirming replay buffer start");
            Ok(false)
        } else if confirmed {
            info!("Replay buffer started successfully.");
            Ok(true)
        } else {
            warn!(
                "Replay buffer start was acknowledged but not active after {:.1}s",
                self.timing.start_verify_timeout.as_secs_f64()
            );
            Ok(false)
        }
    }

    /// Stop the buffer. An inactive buffer counts as stopped.
    pub fn stop_replay_buffer(
        &self,
        connection: &mut ConnectionGuard,
    ) -> Result<bool, ControllerError> {
        connection.require_connection()?;
        match connection.call(request::STOP_REPLAY_BUFFER, None)? {
            Ok(response) if response.is_success() => {
                info!("Replay buffer stopped successfully.");
                Ok(true)
            }
            Ok(response) if response.code() == status::OUTPUT_NOT_RUNNING => {
                info!("Replay buffer is already inactive.");
                Ok(true)
            }
            Ok(response) => {
                error!("Failed to stop replay buffer: {}", response.describe());
                Ok(false)
            }
            Err(err) => {
                error!("Failed to stop replay buffer: {}", err);
                Ok(false)
            }
        }
    }

    /// Save the buffer and wait for the new file to show up in the output
    /// directory. Returns `false` when nothing appears within the save timeout.
    pub fn save_replay(
        &self,
        connection: &mut ConnectionGuard,
        videos: &RetentionManager,
    ) -> Result<bool, ControllerError> {
        connection.require_connection()?;
        let before = videos.get_latest_video();

        match connection.call(request::SAVE_REPLAY_BUFFER, None)? {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                error!("Failed to save replay: {}", response.describe());
                return Ok(false);
            }
            Err(err) => {
                error!("Failed to save replay: {}", err);
                return Ok(false);
            }
        }

        let mut saved_path = None;
        let appeared = poll_until(self.timing.save_timeout, self.timing.poll_interval, || {
            let after = videos.get_latest_video();
            if after.path.is_some() && after.path != before.path {
                saved_path = after.path;
                return Ok(true);
            }
            Ok(false)
        })?;

        match saved_path {
            Some(path) if appeared => {
                info!("Replay saved to: {}", path.display());
                Ok(true)
            }
            _ => {
                warn!("Failed to save replay: timeout reached without detecting a new file.");
                Ok(false)
            }
        }
    }
}

/// Run `check` until it returns true or `timeout` elapses. The check always
/// runs at least once and once more at the deadline.
pub fn poll_until<F>(timeout: Duration, interval: Duration, mut check: F) -> Result<bool, ControllerError>
where
    F: FnMut() -> Result<bool, ControllerError>,
{
    let started = Instant::now();
    loop {
        if check()? {
            return Ok(true);
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            debug!("Gave up polling after {:.1}s", elapsed.as_secs_f64());
            return Ok(false);
        }
        thread::sleep(interval.min(timeout - elapsed));
    }
}
