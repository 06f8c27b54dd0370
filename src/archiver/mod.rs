//! The archiving worker
//!
//! One pass connects, refreshes the group list, walks every selected group from
//! its cursor and disconnects. [`Archiver::run_forever`] repeats passes with a
//! pause that depends on how the last one went.

mod article;
mod groups;

pub use article::ArticleOutcome;
pub use groups::GroupSyncReport;

use crate::client::NntpClient;
use crate::config::ArchiverConfig;
use crate::error::Result;
use crate::mail::MailDecoder;
use crate::partial::{Reassembler, StagingStore};
use crate::store::ArticleStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Ties the client, the store and the reassembly engine together
pub struct Archiver<S, T, D> {
    config: ArchiverConfig,
    store: S,
    reassembler: Reassembler<T, D>,
}

impl<S, T, D> Archiver<S, T, D>
where
    S: ArticleStore,
    T: StagingStore,
    D: MailDecoder,
{
    pub fn new(config: ArchiverConfig, store: S, staging: T, decoder: D) -> Self {
        Self {
            config,
            store,
            reassembler: Reassembler::new(staging, decoder),
        }
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reassembler(&self) -> &Reassembler<T, D> {
        &self.reassembler
    }

    /// Sync every selected group over an established connection
    ///
    /// Returns the number of articles archived.
    pub async fn sync_all(&self, client: &NntpClient) -> Result<u64> {
        let groups = self.update_groups_list(client).await?;

        let mut archived = 0;
        for listing in &groups {
            archived += self.sync_group(client, listing).await?.archived;
        }
        Ok(archived)
    }

    /// One full pass: connect, sync, disconnect
    ///
    /// The connection is closed whether or not the sync succeeded.
    pub async fn run_once(&self) -> Result<u64> {
        let client = NntpClient::connect(Arc::new(self.config.server.clone())).await?;
        let result = self.sync_all(&client).await;
        client.disconnect().await;

        if let Ok(archived) = &result {
            info!("Pass complete: {} articles archived", archived);
        }
        result
    }

    /// Pause before the next pass
    pub fn next_delay(&self, pass: &Result<u64>) -> Duration {
        match pass {
            Ok(archived) if *archived > 0 => self.config.busy_delay,
            Ok(_) => self.config.idle_delay,
            Err(_) => with_jitter(self.config.retry_delay),
        }
    }

    /// Run passes until the process is stopped
    pub async fn run_forever(&self) {
        loop {
            let pass = self.run_once().await;
            if let Err(e) = &pass {
                error!("Pass failed: {}", e);
            }

            let delay = self.next_delay(&pass);
            info!("Next pass in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
    }
}

/// Add 0-10% random jitter
fn with_jitter(delay: Duration) -> Duration {
    let base_ms = delay.as_millis() as u64;
    let jitter = rand::thread_rng().gen_range(0..=(base_ms / 10));
    Duration::from_millis(base_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::ArchiveError;
    use crate::mail::MailParserDecoder;
    use crate::partial::MemoryStaging;
    use crate::store::MemoryStore;

    fn archiver() -> Archiver<MemoryStore, MemoryStaging, MailParserDecoder> {
        Archiver::new(
            ArchiverConfig::new(ServerConfig::plain("localhost")),
            MemoryStore::new(),
            MemoryStaging::new(),
            MailParserDecoder,
        )
    }

    #[test]
    fn test_next_delay() {
        let archiver = archiver();
        assert_eq!(archiver.next_delay(&Ok(3)), Duration::from_secs(300));
        assert_eq!(archiver.next_delay(&Ok(0)), Duration::from_secs(600));

        let retry = archiver.next_delay(&Err(ArchiveError::Timeout));
        assert!(retry >= Duration::from_secs(600));
        assert!(retry <= Duration::from_secs(660));
    }
}
