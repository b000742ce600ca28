//! OBS child process handling

use log::{debug, info, warn};
use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::OBS_LAUNCH_ARGS;
use crate::error::ControllerError;

const TERMINATE_GRACE: Duration = Duration::from_secs(10);
const TERMINATE_POLL: Duration = Duration::from_millis(100);

/// Holds the OBS process this controller started, if any
#[derive(Debug, Default)]
pub struct Launcher {
    child: Option<Child>,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a launched child is still held
    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Spawn OBS minimized with the given profile, from its own directory
    pub fn launch(&mut self, executable: &Path, profile: &str) -> Result<(), ControllerError> {
        let working_dir = executable.parent().filter(|dir| !dir.as_os_str().is_empty());

        let mut command = Command::new(executable);
        command.args(OBS_LAUNCH_ARGS).arg("--profile").arg(profile);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|err| ControllerError::io(executable, err))?;
        info!("OBS launched (pid {})", child.id());
        self.child = Some(child);
        Ok(())
    }

    /// Stop tracking the child so it outlives this launcher
    pub fn release(&mut self) -> Option<u32> {
        self.child.take().map(|child| child.id())
    }

    /// Ask the launched child to exit, killing it after a grace period.
    /// Does nothing when no child is held.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            debug!("No OBS process was launched by this controller");
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("OBS already exited ({})", status);
                return;
            }
            Ok(None) => {}
            Err(err) => warn!("Could not query OBS process state: {}", err),
        }

        request_exit(&mut child);

        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(_)) => {
                    info!("Successfully terminated the OBS process.");
                    return;
                }
                Ok(None) => thread::sleep(TERMINATE_POLL),
                Err(err) => {
                    warn!("Could not wait for OBS to exit: {}", err);
                    break;
                }
            }
        }

        warn!("OBS did not exit within {}s, killing it", TERMINATE_GRACE.as_secs());
        if let Err(err) = child.kill() {
            warn!("Failed to kill OBS: {}", err);
        }
        let _ = child.wait();
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(err) = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
        warn!("Failed to send SIGTERM to OBS: {}", err);
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!("Failed to stop OBS: {}", err);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_without_child_is_noop() {
        let mut launcher = Launcher::new();
        launcher.terminate();
        assert!(!launcher.has_child());
    }

    #[test]
    fn test_launch_missing_executable_is_io_error() {
        let mut launcher = Launcher::new();
        let result = launcher.launch(Path::new("/nonexistent/obs-studio/bin/obs"), "p");
        assert!(matches!(result, Err(ControllerError::Io { .. })));
        assert!(!launcher.has_child());
    }

    #[test]
    fn test_release_leaves_child_running() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let mut launcher = Launcher {
            child: Some(Command::new("sleep").arg("30").spawn().unwrap()),
        };
        let pid = launcher.release().unwrap();
        assert!(!launcher.has_child());
        launcher.terminate();

        // Signal 0 only checks that the process still exists
        let pid = Pid::from_raw(pid as i32);
        assert!(kill(pid, None).is_ok());
        kill(pid, Signal::SIGKILL).unwrap();
    }

    #[test]
    fn test_terminate_stops_running_child() {
        let mut launcher = Launcher {
            child: Some(Command::new("sleep").arg("30").spawn().unwrap()),
        };
        let started = Instant::now();
        launcher.terminate();
        assert!(!launcher.has_child());
        assert!(started.elapsed() < TERMINATE_GRACE);
    }
}
