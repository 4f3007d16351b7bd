//! Minimal blocking HTTP/1.1 client for game stats transports.
//!
//! # Overview
//! Performs a single GET or form-encoded POST over a raw TCP socket and
//! returns the decoded body. Non-200 responses come back as a fixed
//! diagnostic payload (`E\nH\terr\nD\tHTTP Error <code> "<reason>"\n$\tERR\t$`)
//! rather than as an error, so callers can treat the result as data.
//!
//! # Design
//! - `socket::LineSocket` is the leaf: line writes, CR/LF-stripping line
//!   reads, bounded and unbounded byte reads, half-close and close.
//! - `http` renders requests and decodes responses from any `LineRead`,
//!   choosing between `Content-Length`, chunked and read-until-close framing.
//! - `client::MiniClient` runs one exchange per connection and always shuts
//!   the socket down and closes it before returning.
//! - Logging goes through the `log` facade; nothing is printed.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod socket;

pub use client::{http_get, http_post_snapshot, MiniClient, DEFAULT_PATH, DEFAULT_PORT};
pub use config::ClientConfig;
pub use error::{ConnectFailure, Error, WriteFailure};
pub use http::{error_payload, Framing, Headers, Method, ParseWarning, Request, Response, StatusLine};
pub use socket::{LineRead, LineSocket};
