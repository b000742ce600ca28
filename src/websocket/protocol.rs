//! obs-websocket 5.x message types
//!
//! Every frame is a JSON text message `{"op": <opcode>, "d": {...}}`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// RPC version this client speaks
pub const RPC_VERSION: u32 = 1;

pub const OP_HELLO: u8 = 0;
pub const OP_IDENTIFY: u8 = 1;
pub const OP_IDENTIFIED: u8 = 2;
pub const OP_EVENT: u8 = 5;
pub const OP_REQUEST: u8 = 6;
pub const OP_REQUEST_RESPONSE: u8 = 7;

/// Close code OBS sends when the Identify authentication string is wrong
pub const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

/// Request status codes the controller branches on
pub mod status {
    pub const SUCCESS: u16 = 100;
    pub const OUTPUT_RUNNING: u16 = 500;
    pub const OUTPUT_NOT_RUNNING: u16 = 501;
}

/// Request types used by the controller
pub mod request {
    pub const GET_VERSION: &str = "GetVersion";
    pub const START_REPLAY_BUFFER: &str = "StartReplayBuffer";
    pub const STOP_REPLAY_BUFFER: &str = "StopReplayBuffer";
    pub const SAVE_REPLAY_BUFFER: &str = "SaveReplayBuffer";
    pub const GET_REPLAY_BUFFER_STATUS: &str = "GetReplayBufferStatus";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub obs_web_socket_version: String,
    pub rpc_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthChallenge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Bitmask; 0 subscribes to nothing
    pub event_subscriptions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    pub negotiated_rpc_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
}

impl RequestResponse {
    pub fn is_success(&self) -> bool {
        self.request_status.result
    }

    pub fn code(&self) -> u16 {
        self.request_status.code
    }

    /// Status comment, or the bare code when OBS gave none
    pub fn describe(&self) -> String {
        match &self.request_status.comment {
            Some(comment) => format!("{} (code {})", comment, self.request_status.code),
            None => format!("code {}", self.request_status.code),
        }
    }

    /// Read a boolean field from `responseData`
    pub fn data_bool(&self, field: &str) -> Option<bool> {
        self.response_data
            .as_ref()
            .and_then(|data| data.get(field))
            .and_then(Value::as_bool)
    }
}

/// Wrap a payload in an opcode envelope
pub fn envelope<T: Serialize>(op: u8, payload: &T) -> serde_json::Result<String> {
    let d = serde_json::to_value(payload)?;
    serde_json::to_string(&Envelope { op, d })
}

/// obs-websocket authentication string:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}").as_bytes()));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}").as_bytes()))
}
