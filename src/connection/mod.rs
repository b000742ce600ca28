//! Connection guard
//!
//! Owns the single obs-websocket session of a controller. The session is
//! opened lazily by `connect`, released by `disconnect`, and dropped whenever
//! the transport fails so `is_connected` never reports a dead handle.

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::error::ControllerError;
use crate::models::{ConnectionSettings, ObsVersion};
use crate::websocket::protocol::request;
use crate::websocket::{Connector, RequestResponse, Session, SocketError};

/// Outcome of a request that passed the connection guard
pub type CallResult = Result<RequestResponse, SocketError>;

pub struct ConnectionGuard {
    settings: ConnectionSettings,
    connector: Box<dyn Connector>,
    session: Option<Box<dyn Session>>,
}

impl ConnectionGuard {
    pub fn new(settings: ConnectionSettings, connector: Box<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            session: None,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Open and identify a session.
    ///
    /// Returns `Ok(false)` when OBS cannot be reached or rejects the
    /// handshake. A password OBS could never accept, or a missing password
    /// when OBS demands one, is a configuration error.
    pub fn connect(&mut self) -> Result<bool, ControllerError> {
        if self.session.is_some() {
            debug!("Already connected to OBS WebSocket");
            return Ok(true);
        }
        validate_password(self.settings.password.as_deref())?;

        match self.connector.open(&self.settings) {
            Ok(session) => {
                self.session = Some(session);
                info!(
                    "Connected to OBS WebSocket at {}:{}",
                    self.settings.host, self.settings.port
                );
                Ok(true)
            }
            Err(SocketError::AuthRequired) => Err(ControllerError::Configuration(
                "OBS WebSocket requires a password; set connection.password".to_string(),
            )),
            Err(err) => {
                error!("Failed to connect to OBS WebSocket: {}", err);
                Ok(false)
            }
        }
    }

    /// Close and release the session. Returns `true` when no session remains.
    pub fn disconnect(&mut self) -> bool {
        match self.session.take() {
            None => {
                debug!("No active OBS WebSocket connection to disconnect");
                true
            }
            Some(mut session) => {
                if let Err(err) = session.close() {
                    warn!("Error while closing OBS WebSocket connection: {}", err);
                }
                info!("Disconnected from OBS WebSocket");
                true
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Fail fast with `NotConnected` before any I/O
    pub fn require_connection(&self) -> Result<(), ControllerError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ControllerError::NotConnected)
        }
    }

    /// Guarded request. Transport failures drop the session and come back
    /// as the inner `Err`; only the precondition is an outer error.
    pub fn call(
        &mut self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<CallResult, ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotConnected)?;
        let result = session.request(request_type, request_data);
        if let Err(err) = &result {
            warn!(
                "{} failed on the transport, dropping connection: {}",
                request_type, err
            );
            self.session = None;
        }
        Ok(result)
    }

    /// `GetVersion` round-trip on the existing session
    pub fn health_check(&mut self) -> Result<bool, ControllerError> {
        match self.call(request::GET_VERSION, None)? {
            Ok(response) if response.is_success() => {
                debug!("Health check: OBS WebSocket responded");
                Ok(true)
            }
            Ok(response) => {
                warn!(
                    "Health check: GetVersion rejected, dropping connection: {}",
                    response.describe()
                );
                self.drop_session();
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }

    fn drop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.close() {
                warn!("Error while closing OBS WebSocket connection: {}", err);
            }
        }
    }

    pub fn get_version(&mut self) -> Result<Option<ObsVersion>, ControllerError> {
        match self.call(request::GET_VERSION, None)? {
            Ok(response) if response.is_success() => {
                let data = response.response_data.unwrap_or(Value::Null);
                match serde_json::from_value::<ObsVersion>(data) {
                    Ok(version) => Ok(Some(version)),
                    Err(err) => {
                        error!("Unexpected GetVersion payload: {}", err);
                        Ok(None)
                    }
                }
            }
            Ok(response) => {
                error!("GetVersion rejected: {}", response.describe());
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("host", &self.settings.host)
            .field("port", &self.settings.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Reject passwords that could never match what OBS stores in global.ini
fn validate_password(password: Option<&str>) -> Result<(), ControllerError> {
    if let Some(password) = password {
        if password.chars().any(char::is_control) {
            return Err(ControllerError::Configuration(
                "connection.password contains control characters".to_string(),
            ));
        }
        if password.trim() != password {
            return Err(ControllerError::Configuration(
                "connection.password has leading or trailing whitespace".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::protocol::RequestStatus;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        opened: usize,
        closed: usize,
        requests: Vec<String>,
        fail_open: bool,
        fail_requests: bool,
        reject_requests: bool,
    }

    struct FakeSession(Rc<RefCell<Log>>);

    impl Session for FakeSession {
        fn request(&mut self, request_type: &str, _: Option<Value>) -> CallResult {
            let mut log = self.0.borrow_mut();
            log.requests.push(request_type.to_string());
            if log.fail_requests {
                return Err(SocketError::Closed("gone".to_string()));
            }
            let (result, code) = if log.reject_requests {
                (false, 207)
            } else {
                (true, 100)
            };
            Ok(RequestResponse {
                request_type: request_type.to_string(),
                request_id: "1".to_string(),
                request_status: RequestStatus {
                    result,
                    code,
                    comment: None,
                },
                response_data: Some(serde_json::json!({
                    "obsVersion": "30.0.0",
                    "obsWebSocketVersion": "5.3.0",
                    "rpcVersion": 1
                })),
            })
        }

        fn close(&mut self) -> Result<(), SocketError> {
            self.0.borrow_mut().closed += 1;
            Ok(())
        }
    }

    struct FakeConnector(Rc<RefCell<Log>>);

    impl Connector for FakeConnector {
        fn open(&self, _: &ConnectionSettings) -> Result<Box<dyn Session>, SocketError> {
            let mut log = self.0.borrow_mut();
            if log.fail_open {
                return Err(SocketError::Closed("refused".to_string()));
            }
            log.opened += 1;
            Ok(Box::new(FakeSession(self.0.clone())))
        }
    }

    fn guard(password: Option<&str>) -> (ConnectionGuard, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let settings = ConnectionSettings {
            host: "localhost".to_string(),
            port: 4455,
            password: password.map(str::to_string),
        };
        (
            ConnectionGuard::new(settings, Box::new(FakeConnector(log.clone()))),
            log,
        )
    }

    #[test]
    fn test_starts_disconnected() {
        let (guard, _) = guard(None);
        assert!(!guard.is_connected());
        assert!(matches!(
            guard.require_connection(),
            Err(ControllerError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_twice_keeps_one_handle() {
        let (mut guard, log) = guard(None);
        assert!(guard.connect().unwrap());
        assert!(guard.connect().unwrap());
        assert_eq!(log.borrow().opened, 1);
    }

    #[test]
    fn test_failed_connect_returns_false_without_handle() {
        let (mut guard, log) = guard(None);
        log.borrow_mut().fail_open = true;
        assert!(!guard.connect().unwrap());
        assert!(!guard.is_connected());
    }

    #[test]
    fn test_control_character_password_is_configuration_error() {
        let (mut guard, log) = guard(Some("pass\nword"));
        assert!(matches!(
            guard.connect(),
            Err(ControllerError::Configuration(_))
        ));
        assert_eq!(log.borrow().opened, 0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut guard, log) = guard(None);
        assert!(guard.disconnect());
        guard.connect().unwrap();
        assert!(guard.disconnect());
        assert!(guard.disconnect());
        assert_eq!(log.borrow().closed, 1);
        assert!(!guard.is_connected());
    }

    #[test]
    fn test_call_without_connection_does_no_io() {
        let (mut guard, log) = guard(None);
        assert!(matches!(
            guard.call(request::GET_VERSION, None),
            Err(ControllerError::NotConnected)
        ));
        assert!(matches!(
            guard.health_check(),
            Err(ControllerError::NotConnected)
        ));
        assert!(log.borrow().requests.is_empty());
    }

    #[test]
    fn test_health_check_uses_existing_session() {
        let (mut guard, log) = guard(None);
        guard.connect().unwrap();
        assert!(guard.health_check().unwrap());
        assert_eq!(log.borrow().opened, 1);
        assert_eq!(log.borrow().requests, vec!["GetVersion".to_string()]);
    }

    #[test]
    fn test_failed_health_check_marks_disconnected() {
        let (mut guard, log) = guard(None);
        guard.connect().unwrap();
        log.borrow_mut().fail_requests = true;
        assert!(!guard.health_check().unwrap());
        assert!(!guard.is_connected());
    }

    #[test]
    fn test_rejected_health_check_closes_session() {
        let (mut guard, log) = guard(None);
        guard.connect().unwrap();
        log.borrow_mut().reject_requests = true;

        assert!(!guard.health_check().unwrap());
        assert!(!guard.is_connected());
        assert_eq!(log.borrow().closed, 1);

        log.borrow_mut().reject_requests = false;
        assert!(guard.connect().unwrap());
        assert_eq!(log.borrow().opened, 2);
    }

    #[test]
    fn test_get_version_decodes_payload() {
        let (mut guard, _) = guard(None);
        guard.connect().unwrap();
        let version = guard.get_version().unwrap().unwrap();
        assert_eq!(version.obs_version, "30.0.0");
    }
}
