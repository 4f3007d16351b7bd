//! Line- and byte-oriented I/O over a single TCP connection.
//!
//! # Design
//! `LineSocket` owns the stream and a buffered reader over a clone of it.
//! Both live inside one `Option`, so "closed" is a single state: once it is
//! `None`, reads and writes return `Error::Closed` and `shutdown`/`close` do
//! nothing. Dropping the socket half-closes and closes it, which gives the
//! exchange scoped release on every exit path.
//!
//! The line and byte reading rules are free functions over `BufRead` so the
//! protocol layer can be driven from an in-memory buffer in tests through the
//! `LineRead` trait.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::ClientConfig;
use crate::error::{ConnectFailure, Error, WriteFailure};

const CRLF: &str = "\r\n";

/// A source of protocol lines and raw body bytes.
pub trait LineRead {
    /// Read one line with its terminator stripped.
    fn read_line(&mut self) -> Result<String, Error>;

    /// Read up to `max_bytes`, or everything until EOF when `None`.
    fn read(&mut self, max_bytes: Option<usize>) -> Result<Vec<u8>, Error>;
}

/// Strip a trailing CRLF, or failing that a single trailing CR or LF.
pub fn strip_line_ending(line: &[u8]) -> &[u8] {
    if line.ends_with(CRLF.as_bytes()) {
        &line[..line.len() - 2]
    } else if line.ends_with(b"\r") || line.ends_with(b"\n") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

pub fn read_line_from<R: BufRead>(reader: &mut R) -> Result<String, Error> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).map_err(Error::Read)?;
    if n == 0 {
        return Err(Error::EndOfStream);
    }
    let line = String::from_utf8_lossy(strip_line_ending(&buf)).into_owned();
    log::trace!("< {line}");
    Ok(line)
}

pub fn read_from<R: Read>(reader: &mut R, max_bytes: Option<usize>) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    match max_bytes {
        Some(n) => reader.take(n as u64).read_to_end(&mut buf),
        None => reader.read_to_end(&mut buf),
    }
    .map_err(Error::Read)?;
    Ok(buf)
}

struct Conn {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Conn {
    fn configure(stream: TcpStream, config: &ClientConfig) -> io::Result<Self> {
        stream.set_read_timeout(Some(config.io_timeout()))?;
        stream.set_write_timeout(Some(config.io_timeout()))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { stream, reader })
    }
}

/// One blocking TCP connection with line-oriented helpers.
pub struct LineSocket {
    peer: SocketAddr,
    conn: Option<Conn>,
}

impl LineSocket {
    /// Connect to `host:port`, trying every resolved address in turn.
    pub fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self, Error> {
        let fail = |reason: ConnectFailure, source: io::Error| Error::Connect {
            host: host.to_string(),
            port,
            reason,
            source,
        };

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| fail(ConnectFailure::Unresolved, e))?
            .collect();

        let mut last_err = None;
        let mut connected = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, config.connect_timeout()) {
                Ok(stream) => {
                    connected = Some((addr, stream));
                    break;
                }
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        let (peer, stream) = match (connected, last_err) {
            (Some(found), _) => found,
            (None, Some(e)) => return Err(fail(ConnectFailure::classify(&e), e)),
            (None, None) => {
                let e = io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
                return Err(fail(ConnectFailure::Unresolved, e));
            }
        };

        let conn = Conn::configure(stream, config).map_err(|e| fail(ConnectFailure::Other, e))?;

        log::trace!("connected to {host}:{port} via {peer}");
        Ok(Self {
            peer,
            conn: Some(conn),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Send `text` followed by CRLF, writing every byte.
    ///
    /// A broken pipe, reset or timeout closes the socket before the error is
    /// returned.
    pub fn write_line(&mut self, text: &str) -> Result<(), Error> {
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;

        let mut line = String::with_capacity(text.len() + CRLF.len());
        line.push_str(text);
        line.push_str(CRLF);

        log::trace!("> {text}");
        if let Err(source) = conn.stream.write_all(line.as_bytes()) {
            let reason = WriteFailure::classify(&source);
            if reason.closes_connection() {
                self.close();
            }
            return Err(Error::Write { reason, source });
        }
        Ok(())
    }

    /// Stop sending while still allowing the response to be drained.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };
        conn.stream.shutdown(Shutdown::Write).map_err(|source| Error::Write {
            reason: WriteFailure::classify(&source),
            source,
        })
    }

    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            log::trace!("closed connection to {}", self.peer);
        }
    }
}

impl LineRead for LineSocket {
    fn read_line(&mut self) -> Result<String, Error> {
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        read_line_from(&mut conn.reader)
    }

    fn read(&mut self, max_bytes: Option<usize>) -> Result<Vec<u8>, Error> {
        let conn = self.conn.as_mut().ok_or(Error::Closed)?;
        read_from(&mut conn.reader, max_bytes)
    }
}

impl Drop for LineSocket {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.shutdown() {
                log::debug!("shutdown on drop failed: {e}");
            }
            self.close();
        }
    }
}

impl std::fmt::Debug for LineSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSocket")
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .finish()
    }
}
