//! Shared helpers for the socket-level tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use tinyrest::config::{Config, StaticFilesConfig};
use tinyrest::http::headers::Headers;
use tinyrest::http::parser::{read_headers, read_line};
use tinyrest::routing::Router;
use tinyrest::server::Server;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub struct RawResponse {
    pub status_line: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn config(root: Option<&Path>) -> Config {
    let mut cfg = Config::default();
    cfg.server.listen_addr = "127.0.0.1:0".to_string();
    cfg.static_files = root.map(|root| StaticFilesConfig {
        root: root.to_path_buf(),
    });
    cfg
}

pub async fn start(cfg: Config, router: Router) -> (Server, SocketAddr) {
    let mut server = Server::new(&cfg, router).unwrap();
    let addr = server.start().await.unwrap();
    (server, addr)
}

/// Reads one response framed by its `Content-Length`.
pub async fn read_response<R>(reader: &mut R, expect_body: bool) -> RawResponse
where
    R: AsyncBufRead + Unpin,
{
    let status_line = read_line(reader).await.unwrap().expect("status line");
    let headers = read_headers(reader).await.unwrap();

    let length: usize = headers
        .get("Content-Length")
        .map(|v| v.parse().unwrap())
        .unwrap_or(0);

    let mut body = vec![0u8; if expect_body { length } else { 0 }];
    reader.read_exact(&mut body).await.unwrap();

    RawResponse {
        status_line,
        headers,
        body,
    }
}

/// Sends raw request bytes on a fresh connection and reads one response.
pub async fn send(addr: SocketAddr, raw: &[u8]) -> RawResponse {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut reader = BufReader::new(stream);
    reader.get_mut().write_all(raw).await.unwrap();
    read_response(&mut reader, true).await
}

pub async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    let raw = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    send(addr, raw.as_bytes()).await
}

/// True once the peer has closed the connection.
pub async fn at_eof<R>(reader: &mut R) -> bool
where
    R: AsyncBufRead + Unpin,
{
    let mut rest = Vec::new();
    matches!(reader.read_to_end(&mut rest).await, Ok(0))
}
