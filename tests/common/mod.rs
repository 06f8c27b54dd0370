//! Scripted in-process NNTP server for client and archiver tests

#![allow(dead_code)]

use nntp_archiver::{NntpClient, ServerConfig};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

pub const GREETING: &[u8] = b"200 news.test ready\r\n";

/// One expected request line and the bytes sent back for it
pub struct Exchange {
    pub request: String,
    pub response: Vec<u8>,
    /// Responses are written in chunks of this size to exercise framing
    pub chunk_size: usize,
}

impl Exchange {
    pub fn new(request: &str, response: impl AsRef<[u8]>) -> Self {
        Self {
            request: request.to_string(),
            response: response.as_ref().to_vec(),
            chunk_size: usize::MAX,
        }
    }

    /// Expect `request` and never answer it
    pub fn silent(request: &str) -> Self {
        Self::new(request, b"")
    }

    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Run a server that sends `greeting`, then answers requests from `script` in order
///
/// The handle resolves to every request line received, once the client goes away
/// or sends something after the script is exhausted.
pub fn spawn_server(greeting: &[u8], script: Vec<Exchange>) -> (DuplexStream, JoinHandle<Vec<String>>) {
    let (client_end, server_end) = tokio::io::duplex(256 * 1024);
    let greeting = greeting.to_vec();

    let handle = tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(server_end);
        let mut lines = BufReader::new(read_half).lines();
        let mut received = Vec::new();
        let mut script = script.into_iter();

        if write_half.write_all(&greeting).await.is_err() {
            return received;
        }

        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line.clone());
            let Some(exchange) = script.next() else {
                break;
            };
            assert_eq!(line, exchange.request, "unexpected request");

            for chunk in exchange.response.chunks(exchange.chunk_size) {
                if write_half.write_all(chunk).await.is_err() {
                    return received;
                }
                tokio::task::yield_now().await;
            }
        }
        received
    });

    (client_end, handle)
}

/// Connect a client to a scripted server with the default test configuration
pub async fn scripted_client(script: Vec<Exchange>) -> (NntpClient, JoinHandle<Vec<String>>) {
    scripted_client_with(ServerConfig::plain("news.test"), script).await
}

pub async fn scripted_client_with(
    config: ServerConfig,
    script: Vec<Exchange>,
) -> (NntpClient, JoinHandle<Vec<String>>) {
    let (stream, server) = spawn_server(GREETING, script);
    let client = NntpClient::from_stream(Box::new(stream), Arc::new(config))
        .await
        .unwrap();
    (client, server)
}

/// Build a `220` response carrying `article`, dot-stuffed and terminated
pub fn article_response(number: u64, message_id: &str, article: &[u8]) -> Vec<u8> {
    let mut response = format!("220 {} {}\r\n", number, message_id).into_bytes();
    for line in article.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b".") {
            response.push(b'.');
        }
        response.extend_from_slice(line);
    }
    if !response.ends_with(b"\r\n") {
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b".\r\n");
    response
}
