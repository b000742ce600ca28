//! Shared fakes for integration tests: a scripted OBS behind the
//! `Connector` / `Session` seam and a fixed process probe.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use serde_json::{json, Value};

use obs_replay::config::ControllerConfig;
use obs_replay::error::ControllerError;
use obs_replay::models::ConnectionSettings;
use obs_replay::process::ProcessProbe;
use obs_replay::websocket::protocol::{request, status, RequestResponse, RequestStatus};
use obs_replay::websocket::{Connector, Session, SocketError};
use obs_replay::ObsController;

/// Observable state of the scripted OBS
#[derive(Debug, Default)]
pub struct FakeObs {
    pub replay_active: bool,
    /// `StartReplayBuffer` is acknowledged but the buffer never turns active
    pub start_stalls: bool,
    /// File written into the output directory on `SaveReplayBuffer`
    pub save_writes: Option<PathBuf>,
    pub refuse_connections: bool,
    pub drop_on_request: bool,
    /// Reject the next `GetVersion` with a failed request status
    pub reject_next_version: bool,
    pub opened: usize,
    pub closed: usize,
    pub requests: Vec<String>,
}

pub type SharedObs = Rc<RefCell<FakeObs>>;

pub fn fake_obs() -> SharedObs {
    Rc::new(RefCell::new(FakeObs::default()))
}

fn respond(request_type: &str, code: u16, data: Option<Value>) -> RequestResponse {
    RequestResponse {
        request_type: request_type.to_string(),
        request_id: "1".to_string(),
        request_status: RequestStatus {
            result: code == status::SUCCESS,
            code,
            comment: (code != status::SUCCESS).then(|| format!("scripted failure {}", code)),
        },
        response_data: data,
    }
}

pub struct FakeSession(SharedObs);

impl Session for FakeSession {
    fn request(
        &mut self,
        request_type: &str,
        _request_data: Option<Value>,
    ) -> Result<RequestResponse, SocketError> {
        let mut obs = self.0.borrow_mut();
        obs.requests.push(request_type.to_string());
        if obs.drop_on_request {
            return Err(SocketError::Closed("scripted drop".to_string()));
        }

        let response = match request_type {
            request::GET_VERSION if obs.reject_next_version => {
                obs.reject_next_version = false;
                respond(request_type, 207, None)
            }
            request::GET_VERSION => respond(
                request_type,
                status::SUCCESS,
                Some(json!({
                    "obsVersion": "30.1.2",
                    "obsWebSocketVersion": "5.4.2",
                    "rpcVersion": 1,
                    "platform": "linux"
                })),
            ),
            request::GET_REPLAY_BUFFER_STATUS => respond(
                request_type,
                status::SUCCESS,
                Some(json!({ "outputActive": obs.replay_active })),
            ),
            request::START_REPLAY_BUFFER if obs.replay_active => {
                respond(request_type, status::OUTPUT_RUNNING, None)
            }
            request::START_REPLAY_BUFFER => {
                if !obs.start_stalls {
                    obs.replay_active = true;
                }
                respond(request_type, status::SUCCESS, None)
            }
            request::STOP_REPLAY_BUFFER if !obs.replay_active => {
                respond(request_type, status::OUTPUT_NOT_RUNNING, None)
            }
            request::STOP_REPLAY_BUFFER => {
                obs.replay_active = false;
                respond(request_type, status::SUCCESS, None)
            }
            request::SAVE_REPLAY_BUFFER if !obs.replay_active => {
                respond(request_type, status::OUTPUT_NOT_RUNNING, None)
            }
            request::SAVE_REPLAY_BUFFER => {
                if let Some(path) = &obs.save_writes {
                    fs::write(path, vec![0u8; 64]).expect("write saved replay");
                }
                respond(request_type, status::SUCCESS, None)
            }
            other => respond(other, 204, None),
        };
        Ok(response)
    }

    fn close(&mut self) -> Result<(), SocketError> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

pub struct FakeConnector(pub SharedObs);

impl Connector for FakeConnector {
    fn open(&self, _settings: &ConnectionSettings) -> Result<Box<dyn Session>, SocketError> {
        let mut obs = self.0.borrow_mut();
        if obs.refuse_connections {
            return Err(SocketError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        obs.opened += 1;
        Ok(Box::new(FakeSession(self.0.clone())))
    }
}

/// Process probe with a switchable answer
pub struct FakeProbe(pub Rc<RefCell<bool>>);

impl ProcessProbe for FakeProbe {
    fn is_process_running(&self, _process_name: &str) -> Result<bool, ControllerError> {
        Ok(*self.0.borrow())
    }
}

/// Config pointing at `output_dir` with short verification windows
pub fn test_config(output_dir: &Path) -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.replay.output_dir = output_dir.to_path_buf();
    config.replay.save_timeout_secs = 1.0;
    config.replay.poll_interval_secs = 0.1;
    config.replay.start_verify_timeout_secs = 0.5;
    config.obs.install_dir = output_dir.join("no-obs-here");
    config.obs.config_dir = Some(output_dir.join("obs-config"));
    config
}

pub struct Harness {
    pub controller: ObsController,
    pub obs: SharedObs,
    pub running: Rc<RefCell<bool>>,
}

pub fn harness(config: ControllerConfig) -> Harness {
    let obs = fake_obs();
    let running = Rc::new(RefCell::new(true));
    let controller = ObsController::with_parts(
        config,
        Box::new(FakeProbe(running.clone())),
        Box::new(FakeConnector(obs.clone())),
    )
    .expect("valid test config");
    Harness {
        controller,
        obs,
        running,
    }
}

/// Write `size` bytes at `dir/name` with an mtime `age_secs` in the past
pub fn write_video(dir: &Path, name: &str, size: usize, age_secs: u64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0u8; size]).unwrap();
    let modified = SystemTime::now() - Duration::from_secs(age_secs);
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
    path
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
