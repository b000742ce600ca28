//! Synchronous obs-websocket session over a plain `ws://` TCP stream

use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace};
use serde_json::Value;
use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::CloseFrame;
use tungstenite::{Message, WebSocket};
use url::Url;

use super::protocol::{
    auth_response, envelope, Envelope, Hello, Identified, Identify, Request, RequestResponse,
    CLOSE_AUTHENTICATION_FAILED, OP_EVENT, OP_HELLO, OP_IDENTIFIED, OP_IDENTIFY, OP_REQUEST,
    OP_REQUEST_RESPONSE, RPC_VERSION,
};
use super::{Connector, Session, SocketError};
use crate::models::ConnectionSettings;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens sessions against a live OBS instance
#[derive(Debug, Clone, Copy)]
pub struct WsConnector {
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl WsConnector {
    pub fn new(connect_timeout: Duration, io_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            io_timeout,
        }
    }
}

impl Connector for WsConnector {
    fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn Session>, SocketError> {
        let url = session_url(settings)?;
        debug!("Connecting to obs-websocket at {}", url);
        let socket = connect_socket(&url, self.connect_timeout, self.io_timeout)?;

        let mut session = ObsSession {
            socket,
            next_request_id: 1,
        };
        session.identify(settings.password.as_deref())?;
        Ok(Box::new(session))
    }
}

/// `ws://host:port` for the configured endpoint
pub fn session_url(settings: &ConnectionSettings) -> Result<Url, SocketError> {
    let host = settings.host.trim();
    if host.is_empty() {
        return Err(SocketError::InvalidAddress("host is empty".to_string()));
    }
    // Bare IPv6 literals need brackets in a URL authority
    let authority = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    Url::parse(&format!("ws://{}:{}", authority, settings.port))
        .map_err(|err| SocketError::InvalidAddress(err.to_string()))
}

fn connect_socket(
    url: &Url,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<WebSocket<TcpStream>, SocketError> {
    let host = url
        .host_str()
        .ok_or_else(|| SocketError::InvalidAddress("websocket URL is missing a host".to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| SocketError::InvalidAddress("websocket URL is missing a port".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| SocketError::InvalidAddress(format!("failed to resolve '{host}:{port}'")))?;

    let stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(io_timeout))?;
    stream.set_write_timeout(Some(io_timeout))?;

    let request = url
        .as_str()
        .into_client_request()
        .map_err(|err| SocketError::InvalidAddress(err.to_string()))?;

    let (socket, _response) =
        tungstenite::client::client(request, stream).map_err(|err| match err {
            tungstenite::HandshakeError::Failure(ws_err) => SocketError::WebSocket(ws_err),
            tungstenite::HandshakeError::Interrupted(_) => {
                SocketError::Closed("websocket handshake interrupted".to_string())
            }
        })?;
    Ok(socket)
}

fn close_error(frame: Option<CloseFrame<'_>>) -> SocketError {
    match frame {
        Some(frame) if u16::from(frame.code) == CLOSE_AUTHENTICATION_FAILED => {
            SocketError::AuthenticationFailed
        }
        Some(frame) => SocketError::Closed(format!("{} ({})", frame.reason, u16::from(frame.code))),
        None => SocketError::Closed("no close reason given".to_string()),
    }
}

struct ObsSession {
    socket: WebSocket<TcpStream>,
    next_request_id: u64,
}

impl ObsSession {
    fn send(&mut self, text: String) -> Result<(), SocketError> {
        trace!("obs-websocket >> {}", text);
        self.socket.send(Message::Text(text))?;
        Ok(())
    }

    fn read_envelope(&mut self) -> Result<Envelope, SocketError> {
        loop {
            match self.socket.read()? {
                Message::Text(text) => {
                    trace!("obs-websocket << {}", text);
                    return Ok(serde_json::from_str(&text)?);
                }
                Message::Close(frame) => return Err(close_error(frame)),
                Message::Binary(_) => {
                    return Err(SocketError::Malformed(
                        "received binary frame; expected JSON text".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }

    fn identify(&mut self, password: Option<&str>) -> Result<(), SocketError> {
        let hello = self.read_envelope()?;
        if hello.op != OP_HELLO {
            return Err(SocketError::Malformed(format!(
                "expected Hello, got opcode {}",
                hello.op
            )));
        }
        let hello: Hello = serde_json::from_value(hello.d)?;
        debug!(
            "obs-websocket {} (rpc {}), authentication {}",
            hello.obs_web_socket_version,
            hello.rpc_version,
            if hello.authentication.is_some() { "required" } else { "disabled" }
        );

        let authentication = match (&hello.authentication, password) {
            (Some(challenge), Some(password)) => Some(auth_response(
                password,
                &challenge.salt,
                &challenge.challenge,
            )),
            (Some(_), None) => return Err(SocketError::AuthRequired),
            (None, _) => None,
        };

        let identify = Identify {
            rpc_version: RPC_VERSION,
            authentication,
            event_subscriptions: 0,
        };
        self.send(envelope(OP_IDENTIFY, &identify)?)?;

        loop {
            let message = self.read_envelope()?;
            if message.op == OP_IDENTIFIED {
                let identified: Identified = serde_json::from_value(message.d)?;
                debug!(
                    "Identified with obs-websocket (rpc {})",
                    identified.negotiated_rpc_version
                );
                return Ok(());
            }
            debug!("Ignoring opcode {} before Identified", message.op);
        }
    }
}

impl Session for ObsSession {
    fn request(
        &mut self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<RequestResponse, SocketError> {
        let request_id = self.next_request_id.to_string();
        self.next_request_id += 1;

        let request = Request {
            request_type: request_type.to_string(),
            request_id: request_id.clone(),
            request_data,
        };
        self.send(envelope(OP_REQUEST, &request)?)?;

        loop {
            let message = self.read_envelope()?;
            match message.op {
                OP_REQUEST_RESPONSE => {
                    let response: RequestResponse = serde_json::from_value(message.d)?;
                    if response.request_id == request_id {
                        return Ok(response);
                    }
                    debug!("Dropping response for stale request {}", response.request_id);
                }
                OP_EVENT => {}
                other => debug!("Ignoring opcode {} while waiting for {}", other, request_type),
            }
        }
    }

    fn close(&mut self) -> Result<(), SocketError> {
        match self.socket.close(None) {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {}
            Err(err) => return Err(err.into()),
        }

        // Wait briefly for the peer's close frame to finish the handshake
        self.socket
            .get_mut()
            .set_read_timeout(Some(CLOSE_DRAIN_TIMEOUT))?;
        loop {
            match self.socket.read() {
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => break,
                Err(err) => {
                    debug!("Close handshake did not complete: {}", err);
                    break;
                }
            }
        }

        let _ = self.socket.get_mut().shutdown(Shutdown::Both);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str, port: u16) -> ConnectionSettings {
        ConnectionSettings {
            host: host.to_string(),
            port,
            password: None,
        }
    }

    #[test]
    fn test_session_url_hostname() {
        let url = session_url(&settings("localhost", 4455)).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:4455/");
    }

    #[test]
    fn test_session_url_brackets_ipv6() {
        let url = session_url(&settings("::1", 4455)).unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.port(), Some(4455));
    }

    #[test]
    fn test_session_url_rejects_empty_host() {
        assert!(matches!(
            session_url(&settings("  ", 4455)),
            Err(SocketError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_connect_refused_is_io_error() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let connector = WsConnector::new(Duration::from_millis(500), Duration::from_millis(500));
        let result = connector.open(&settings("127.0.0.1", port));
        assert!(matches!(result, Err(SocketError::Io(_))));
    }
}
