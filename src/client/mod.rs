//! NNTP client for the archiver
//!
//! Commands are strictly serialised: one command is on the wire at a time, and
//! concurrent callers wait in FIFO order behind it (tokio's mutex is fair). The
//! wait queue is bounded; a caller that would exceed the bound gets
//! [`ArchiveError::Busy`](crate::ArchiveError::Busy) without anything being written.

mod articles;
mod connection;
pub(crate) mod framer;
mod group_ops;
mod io;
mod listing;
mod state;

pub use connection::NntpStream;
pub use framer::ResponseAccumulator;
pub use state::ConnectionState;

use crate::config::ServerConfig;
use crate::error::{ArchiveError, Result};
use io::Transport;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Async NNTP client covering greet, list, select, fetch and quit
///
/// The client is cheap to clone; clones share the same connection and queue.
///
/// # Example
///
/// ```no_run
/// use nntp_archiver::{NntpClient, ServerConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ServerConfig::plain("news.example.com");
/// let client = NntpClient::connect(Arc::new(config)).await?;
///
/// let info = client.select_group("comp.test").await?;
/// println!("Group has about {} articles", info.total_estimate);
///
/// let raw = client.fetch_article(info.first).await?;
/// println!("First article is {} bytes", raw.len());
///
/// client.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
#[must_use]
pub struct NntpClient {
    shared: Arc<Shared>,
}

struct Shared {
    /// The single command slot
    slot: Mutex<Transport>,
    /// Callers currently holding or waiting for the slot
    in_line: AtomicUsize,
    /// Server configuration
    config: Arc<ServerConfig>,
}

/// Exclusive access to the transport for one command
pub(super) struct SlotGuard<'a> {
    transport: MutexGuard<'a, Transport>,
    _ticket: QueueTicket<'a>,
}

struct QueueTicket<'a>(&'a AtomicUsize);

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Deref for SlotGuard<'_> {
    type Target = Transport;

    fn deref(&self) -> &Transport {
        &self.transport
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }
}

impl NntpClient {
    fn from_transport(transport: Transport, config: Arc<ServerConfig>) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(transport),
                in_line: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// Wait for the command slot
    ///
    /// Fails with `Busy` when `max_queued_commands` callers are already waiting
    /// behind the one in flight.
    pub(super) async fn acquire(&self) -> Result<SlotGuard<'_>> {
        let ahead = self.shared.in_line.fetch_add(1, Ordering::SeqCst);
        let ticket = QueueTicket(&self.shared.in_line);

        if ahead > self.shared.config.max_queued_commands {
            debug!(
                "Rejecting command: {} callers already in line (max queued {})",
                ahead, self.shared.config.max_queued_commands
            );
            return Err(ArchiveError::Busy);
        }

        let transport = self.shared.slot.lock().await;
        Ok(SlotGuard {
            transport,
            _ticket: ticket,
        })
    }

    /// Wait for the command slot however many callers are already in line
    pub(super) async fn acquire_unbounded(&self) -> SlotGuard<'_> {
        self.shared.in_line.fetch_add(1, Ordering::SeqCst);
        let ticket = QueueTicket(&self.shared.in_line);
        let transport = self.shared.slot.lock().await;
        SlotGuard {
            transport,
            _ticket: ticket,
        }
    }

    /// Take the command slot only if nothing is in flight or waiting
    pub(super) fn try_acquire(&self) -> Result<SlotGuard<'_>> {
        let transport = self
            .shared
            .slot
            .try_lock()
            .map_err(|_| ArchiveError::Busy)?;
        self.shared.in_line.fetch_add(1, Ordering::SeqCst);
        Ok(SlotGuard {
            transport,
            _ticket: QueueTicket(&self.shared.in_line),
        })
    }

    /// Server configuration this client was created with
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// Get the currently selected newsgroup, if any
    pub async fn current_group(&self) -> Option<String> {
        self.shared.slot.lock().await.current_group.clone()
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.shared.slot.lock().await.state
    }
}
