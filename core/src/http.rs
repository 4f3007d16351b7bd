//! HTTP/1.1 request rendering and response decoding.
//!
//! # Design
//! Everything here is independent of the socket: requests render to a list of
//! lines, and responses are decoded from any `LineRead` source. The exchange
//! in `client.rs` feeds these a `LineSocket`; tests feed them memory.
//!
//! Parsing is lenient on purpose. An odd protocol token or a non-numeric
//! status code becomes a `ParseWarning`, is logged, and decoding continues.
//! Only shapes that leave nothing to work with (a status line without a code,
//! an unreadable chunk size) are errors.

use std::collections::HashMap;
use std::fmt;

use crate::error::Error;
use crate::socket::LineRead;

pub const HTTP_VERSION: &str = "HTTP/1.1";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single request, rendered line by line onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub host: String,
    pub body: Option<String>,
}

impl Request {
    pub fn get(host: &str, path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            host: host.to_string(),
            body: None,
        }
    }

    pub fn post(host: &str, path: &str, body: &str) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            host: host.to_string(),
            body: Some(body.to_string()),
        }
    }

    /// The request as the exact sequence of lines to send, without CRLFs.
    ///
    /// A POST sends its body as one more line followed by an empty line; the
    /// declared `Content-Length` covers the body bytes only.
    pub fn lines(&self, user_agent: &str) -> Vec<String> {
        let mut lines = vec![
            format!("{} {} {HTTP_VERSION}", self.method.as_str(), self.path),
            format!("Host: {}", self.host),
            format!("User-Agent: {user_agent}"),
        ];
        if let Some(body) = &self.body {
            lines.push(format!("Content-Type: {FORM_CONTENT_TYPE}"));
            lines.push(format!("Content-Length: {}", body.len()));
        }
        lines.push("Connection: close".to_string());
        lines.push(String::new());
        if let Some(body) = &self.body {
            lines.push(body.clone());
            lines.push(String::new());
        }
        lines
    }
}

/// A non-fatal oddity found while parsing a response head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// The status line did not start with `HTTP/1.1`.
    UnknownVersion(String),
    /// The status code token was not an integer; the code is taken as 0.
    NonNumericStatus(String),
    /// A header line had no colon and was skipped.
    MalformedHeader(String),
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnknownVersion(token) => write!(f, "unknown status response ({token})"),
            ParseWarning::NonNumericStatus(token) => write!(f, "non-numeric status code ({token})"),
            ParseWarning::MalformedHeader(line) => write!(f, "header line without a colon ({line})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: String,
    pub code: u32,
    pub reason: String,
}

impl StatusLine {
    /// Split on whitespace into version, code and reason phrase.
    pub fn parse(line: &str) -> Result<(Self, Vec<ParseWarning>), Error> {
        let mut tokens = line.split_whitespace();
        let (Some(version), Some(code_token)) = (tokens.next(), tokens.next()) else {
            return Err(Error::MalformedStatusLine(line.to_string()));
        };
        let reason = tokens.collect::<Vec<_>>().join(" ");

        let mut warnings = Vec::new();
        if version != HTTP_VERSION {
            warnings.push(ParseWarning::UnknownVersion(version.to_string()));
        }
        let code = code_token.parse::<u32>().unwrap_or_else(|_| {
            warnings.push(ParseWarning::NonNumericStatus(code_token.to_string()));
            0
        });

        let status = Self {
            version: version.to_string(),
            code,
            reason,
        };
        Ok((status, warnings))
    }

    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

/// Response headers keyed by name exactly as received. Last value wins.
///
/// A second map keyed by the ASCII-lowercased name records the last value
/// seen under any spelling, so a case-insensitive lookup has one answer even
/// when a server repeats a header in different cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl Headers {
    pub fn insert(&mut self, name: &str, value: &str) {
        self.exact.insert(name.to_string(), value.to_string());
        self.folded.insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.exact.get(name).map(String::as_str)
    }

    /// The last value received under any letter case of `name`. Framing
    /// decisions use this so servers that send lowercase names are still
    /// decoded correctly.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.folded.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Number of distinct names as received.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Split a header line on its first colon and trim both halves.
pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
}

/// Status line, headers, and anything odd noticed while reading them.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusLine,
    pub headers: Headers,
    pub warnings: Vec<ParseWarning>,
}

pub fn read_head<R: LineRead + ?Sized>(src: &mut R) -> Result<ResponseHead, Error> {
    let (status, mut warnings) = StatusLine::parse(&src.read_line()?)?;
    for warning in &warnings {
        log::warn!("miniclient: {warning}");
    }
    log::trace!("status parsed: {} {}", status.code, status.reason);

    let mut headers = Headers::default();
    loop {
        let line = src.read_line()?;
        if line.is_empty() {
            break;
        }
        match parse_header_line(&line) {
            Some((name, value)) => headers.insert(name, value),
            None => {
                let warning = ParseWarning::MalformedHeader(line.clone());
                log::warn!("miniclient: {warning}");
                warnings.push(warning);
            }
        }
    }
    log::trace!("headers parsed: {} entries", headers.len());

    Ok(ResponseHead {
        status,
        headers,
        warnings,
    })
}

/// How the body of a successful response is delimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// A `Content-Length` header was sent. The declared value is kept for
    /// logging only; the body is still read until the peer closes.
    ContentLength(String),
    Chunked,
    UntilClose,
}

impl Framing {
    pub fn select(headers: &Headers) -> Self {
        if let Some(declared) = headers.get_ignore_case("Content-Length") {
            Framing::ContentLength(declared.to_string())
        } else if headers.get_ignore_case("Transfer-Encoding") == Some("chunked") {
            Framing::Chunked
        } else {
            Framing::UntilClose
        }
    }
}

pub fn read_body<R: LineRead + ?Sized>(src: &mut R, framing: &Framing) -> Result<Vec<u8>, Error> {
    log::debug!("decoding body with {framing:?}");
    match framing {
        Framing::ContentLength(_) | Framing::UntilClose => src.read(None),
        Framing::Chunked => read_chunked(src),
    }
}

/// Parse a chunk-size line: hex digits, optionally padded, optionally
/// followed by `;extensions`.
pub fn parse_chunk_size(line: &str) -> Result<usize, Error> {
    let digits = line.split(';').next().unwrap_or_default().trim();
    usize::from_str_radix(digits, 16).map_err(|_| Error::InvalidChunkSize(line.to_string()))
}

pub fn read_chunked<R: LineRead + ?Sized>(src: &mut R) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    loop {
        let size = parse_chunk_size(&src.read_line()?)?;
        if size != 0 {
            body.extend_from_slice(&src.read(Some(size))?);
        }
        // CRLF after the chunk data, or the blank line after the last chunk.
        src.read_line()?;
        if size == 0 {
            break;
        }
    }
    Ok(body)
}

/// The synthetic payload returned in place of a body for non-200 responses.
pub fn error_payload(code: u32, reason: &str) -> String {
    format!("E\nH\terr\nD\tHTTP Error {code} \"{reason}\"\n$\tERR\t$")
}

/// A decoded response. `body` is only read for status 200 and is empty
/// otherwise.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    /// The body for a 200, or the synthetic error payload for anything else.
    pub fn into_payload(self) -> Vec<u8> {
        if self.status.is_ok() {
            self.body
        } else {
            error_payload(self.status.code, &self.status.reason).into_bytes()
        }
    }
}

pub fn read_response<R: LineRead + ?Sized>(src: &mut R) -> Result<Response, Error> {
    let ResponseHead { status, headers, .. } = read_head(src)?;
    let body = if status.is_ok() {
        read_body(src, &Framing::select(&headers))?
    } else {
        Vec::new()
    };
    log::trace!("body decoded: {} bytes", body.len());
    Ok(Response {
        status,
        headers,
        body,
    })
}
