//! Low-level I/O for the NNTP transport
//!
//! One round trip = write the request line (nothing for the greeting), then read
//! chunks into a fresh [`ResponseAccumulator`] until the framer reports the
//! response complete. Every wait is bounded by a deadline; when it expires, or the
//! stream fails, the connection is dropped and must be re-established.

use super::connection::NntpStream;
use super::framer::ResponseAccumulator;
use super::state::ConnectionState;
use crate::commands::{Command, Terminator};
use crate::error::{ArchiveError, Result};
use crate::response::FramedResponse;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

const SINGLE_LINE_TIMEOUT: Duration = Duration::from_secs(60);
const MULTILINE_TIMEOUT: Duration = Duration::from_secs(180);
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// The connection plus the state the protocol ties to it
pub(crate) struct Transport {
    stream: Option<Box<dyn NntpStream>>,
    pub(super) state: ConnectionState,
    /// Currently selected newsgroup
    pub(super) current_group: Option<String>,
    /// Deadline override from the configuration
    response_timeout: Option<Duration>,
}

impl Transport {
    pub(super) fn new(stream: Box<dyn NntpStream>, response_timeout: Option<Duration>) -> Self {
        Self {
            stream: Some(stream),
            state: ConnectionState::Connecting,
            current_group: None,
            response_timeout,
        }
    }

    fn deadline(&self, command: Command) -> Duration {
        self.response_timeout
            .unwrap_or(match command.descriptor().terminator {
                Terminator::SingleLine => SINGLE_LINE_TIMEOUT,
                Terminator::MultiLine => MULTILINE_TIMEOUT,
            })
    }

    /// Issue `command` and wait for its framed response
    ///
    /// The greeting is only accepted while connecting; every other command needs an
    /// idle connection. A command found still in flight (its caller gave up midway)
    /// yields `Busy` without writing anything.
    pub(super) async fn round_trip(
        &mut self,
        command: Command,
        argument: Option<&str>,
    ) -> Result<FramedResponse> {
        match (self.state, command) {
            (ConnectionState::AwaitingResponse, _) => return Err(ArchiveError::Busy),
            (ConnectionState::Connecting, Command::Greeting) | (ConnectionState::Idle, _) => {}
            _ => return Err(ArchiveError::ConnectionClosed),
        }

        let descriptor = command.descriptor();
        let request = descriptor.request(argument)?;
        let deadline = self.deadline(command);
        let stream = self.stream.as_mut().ok_or(ArchiveError::ConnectionClosed)?;

        self.state = ConnectionState::AwaitingResponse;
        let exchange = async {
            if let Some(line) = &request {
                trace!("Sending command: {}", line.trim_end());
                stream.write_all(line.as_bytes()).await?;
                stream.flush().await?;
            }
            read_response(stream.as_mut(), ResponseAccumulator::new(descriptor)).await
        };

        match timeout(deadline, exchange).await {
            Ok(Ok(response)) => {
                self.state = ConnectionState::Idle;
                debug!("{:?} completed: {}", command, response.status_line);
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!("{:?} failed on the wire: {}", command, e);
                self.drop_connection();
                Err(e)
            }
            Err(_) => {
                warn!("{:?} timed out after {:?}, dropping connection", command, deadline);
                self.drop_connection();
                Err(ArchiveError::Timeout)
            }
        }
    }

    /// Close the stream (best effort) and forget the session
    pub(super) async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take()
            && let Err(e) = stream.shutdown().await
        {
            debug!("Error shutting down stream: {}", e);
        }
        self.state = ConnectionState::Disconnected;
        self.current_group = None;
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
        self.current_group = None;
    }
}

async fn read_response(
    stream: &mut dyn NntpStream,
    mut accumulator: ResponseAccumulator,
) -> Result<FramedResponse> {
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(ArchiveError::ConnectionClosed);
        }
        trace!("Received {} bytes ({} accumulated)", n, accumulator.len() + n);

        if let Some(response) = accumulator.push(&chunk[..n]) {
            return Ok(response);
        }
    }
}
