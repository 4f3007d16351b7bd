//! One-shot HTTP exchanges over a `LineSocket`.
//!
//! # Design
//! `MiniClient` holds only a `ClientConfig` and carries no state between
//! calls. Every exchange opens its own connection, sends one request, decodes
//! one response and closes. The socket is shut down and closed after the
//! exchange whether it succeeded or not; `LineSocket`'s `Drop` backs this up
//! if a panic unwinds through the exchange.
//!
//! A non-200 status is not an error. `get` and `post_snapshot` flatten it into
//! the fixed diagnostic payload that stats consumers already understand;
//! `send` returns the structured `Response` for callers that want the status.

use crate::config::ClientConfig;
use crate::error::{ConnectFailure, Error};
use crate::http::{read_response, Request, Response};
use crate::socket::LineSocket;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_PATH: &str = "/";

#[derive(Debug, Clone, Default)]
pub struct MiniClient {
    config: ClientConfig,
}

impl MiniClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `path` and return the body, or the diagnostic payload for a
    /// non-200 status.
    pub fn get(&self, host: &str, port: u16, path: &str) -> Result<Vec<u8>, Error> {
        self.send(&Request::get(host, path), port)
            .map(Response::into_payload)
    }

    /// POST a form-encoded snapshot and return the body, or the diagnostic
    /// payload for a non-200 status.
    pub fn post_snapshot(&self, host: &str, port: u16, path: &str, snapshot: &str) -> Result<Vec<u8>, Error> {
        self.send(&Request::post(host, path, snapshot), port)
            .map(Response::into_payload)
    }

    /// Run one request/response exchange against `request.host:port`.
    pub fn send(&self, request: &Request, port: u16) -> Result<Response, Error> {
        let mut socket = match LineSocket::connect(&request.host, port, &self.config) {
            Ok(socket) => socket,
            Err(err) => {
                if let Error::Connect {
                    reason: ConnectFailure::Refused,
                    ..
                } = &err
                {
                    log::warn!("Connection refused by server {} on port {port}", request.host);
                }
                return Err(err);
            }
        };

        let result = exchange(&mut socket, request, &self.config.user_agent);

        if let Err(e) = socket.shutdown() {
            log::debug!("shutdown after exchange with {} failed: {e}", socket.peer_addr());
        }
        socket.close();

        match &result {
            Ok(response) => log::debug!(
                "{} {} -> {} ({} bytes)",
                request.method.as_str(),
                request.path,
                response.status.code,
                response.body.len()
            ),
            Err(e) => log::debug!("{} {} failed: {e}", request.method.as_str(), request.path),
        }
        result
    }
}

fn exchange(socket: &mut LineSocket, request: &Request, user_agent: &str) -> Result<Response, Error> {
    for line in request.lines(user_agent) {
        socket.write_line(&line)?;
    }
    log::trace!("request sent to {}", socket.peer_addr());
    read_response(socket)
}

/// GET `path` from `host:port` with the default configuration.
pub fn http_get(host: &str, port: u16, path: &str) -> Result<Vec<u8>, Error> {
    MiniClient::default().get(host, port, path)
}

/// POST `snapshot` to `host:port` with the default configuration.
pub fn http_post_snapshot(host: &str, port: u16, path: &str, snapshot: &str) -> Result<Vec<u8>, Error> {
    MiniClient::default().post_snapshot(host, port, path, snapshot)
}
