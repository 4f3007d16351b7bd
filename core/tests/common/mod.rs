//! Peers for the integration tests: the live mock server, and scripted raw
//! TCP peers for framings and request shapes hyper will not produce.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Start the mock server on a random port in a background runtime.
pub fn spawn_mock_server() -> SocketAddr {
    let std_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// What a scripted peer saw from the client.
#[derive(Debug, Default)]
pub struct Captured {
    /// Request head lines, CRLF stripped, without the terminating blank line.
    pub head: Vec<String>,
    /// Exactly `Content-Length` bytes following the head.
    pub body: Vec<u8>,
    /// Whatever arrived after the declared body until the client closed.
    pub trailer: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head
            .iter()
            .skip(1)
            .filter_map(|line| line.split_once(':'))
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.trim())
    }
}

/// Accept one connection, capture the request, send `response` verbatim and
/// half-close. The peer keeps reading until the client closes so it never
/// resets the connection with unread data.
pub fn scripted_peer(response: impl Into<Vec<u8>>) -> (u16, JoinHandle<Captured>) {
    let response = response.into();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut captured = Captured::default();

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            if line.is_empty() {
                break;
            }
            captured.head.push(line);
        }

        if let Some(len) = captured.header("Content-Length").map(|v| v.parse::<usize>().unwrap()) {
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).unwrap();
            captured.body = body;
        }

        stream.write_all(&response).unwrap();
        stream.shutdown(Shutdown::Write).unwrap();
        let _ = reader.read_to_end(&mut captured.trailer);
        captured
    });

    (port, handle)
}

/// Encode `pieces` with chunked transfer-encoding, including the final
/// zero-size chunk and blank line.
pub fn chunked(pieces: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for piece in pieces {
        out.extend_from_slice(format!("{:x}\r\n", piece.len()).as_bytes());
        out.extend_from_slice(piece);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
