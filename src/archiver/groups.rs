//! Group list bookkeeping and per-group walks

use super::Archiver;
use super::article::ArticleOutcome;
use crate::client::NntpClient;
use crate::commands::GroupListing;
use crate::error::Result;
use crate::mail::MailDecoder;
use crate::partial::StagingStore;
use crate::store::ArticleStore;
use tracing::{debug, info, warn};

/// Tally of one group walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSyncReport {
    /// Article numbers walked (cursor advances)
    pub processed: u64,
    /// Articles persisted
    pub archived: u64,
    /// The server refused the group; its cursor is left for the next pass
    pub refused: bool,
}

impl<S, T, D> Archiver<S, T, D>
where
    S: ArticleStore,
    T: StagingStore,
    D: MailDecoder,
{
    /// List the server's groups, keep the configured ones and record their bounds
    pub async fn update_groups_list(&self, client: &NntpClient) -> Result<Vec<GroupListing>> {
        let listed = client.list_groups().await?;
        let total = listed.len();

        let mut selected = Vec::new();
        for listing in listed {
            if !self.config.accepts_group(&listing.group) {
                continue;
            }
            self.store
                .upsert_group(&listing.group, listing.first, listing.last)
                .await?;
            selected.push(listing);
        }

        info!("Archiving {} of {} listed groups", selected.len(), total);
        Ok(selected)
    }

    /// Walk `listing` from the persisted cursor up to its last article
    ///
    /// The cursor is saved after every article number, so an interrupted walk
    /// resumes with the next number. A group the server refuses to select is
    /// reported as `refused` and not walked.
    pub async fn sync_group(
        &self,
        client: &NntpClient,
        listing: &GroupListing,
    ) -> Result<GroupSyncReport> {
        let group = listing.group.as_str();
        let cursor = self.store.group_cursor(group).await?;
        let mut report = GroupSyncReport::default();

        if cursor >= listing.last {
            debug!("Group {} already synced (cursor {})", group, cursor);
            return Ok(report);
        }

        if let Err(e) = client.select_group(group).await {
            if !e.is_skippable() {
                return Err(e);
            }
            warn!("Skipping group {} this pass: {}", group, e);
            report.refused = true;
            return Ok(report);
        }

        let start = (cursor + 1).max(listing.first);
        info!(
            "Syncing {} from {} to {} (cursor {})",
            group, start, listing.last, cursor
        );

        for number in start..=listing.last {
            let outcome = self.process_article(client, group, number).await?;
            self.store.set_group_cursor(group, number).await?;

            report.processed += 1;
            if matches!(outcome, ArticleOutcome::Archived(_)) {
                report.archived += 1;
            }
        }

        info!(
            "Group {}: {} numbers processed, {} articles archived",
            group, report.processed, report.archived
        );
        Ok(report)
    }
}
