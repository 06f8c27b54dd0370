//! Article retrieval (RFC 3977 §6.2.1)
//!
//! Articles are fetched by number within the selected group. The payload is cut
//! out of the framed bytes directly, so binary content is never run through a
//! text decoder before it reaches the MIME decoder.

use crate::commands::{self, Command};
use crate::error::{ArchiveError, Result};
use crate::mail::{MailDecoder, ParsedMail};
use tracing::trace;

use super::{NntpClient, SlotGuard};

impl NntpClient {
    /// Fetch the raw bytes of article `number` in the selected group
    ///
    /// Returns everything between the status line and the terminator, dot-stuffing
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - [`ArchiveError::NoGroupSelected`] - No GROUP has succeeded on this connection
    /// - [`ArchiveError::Protocol`] - Server answered with anything but 220 (e.g. 423)
    /// - [`ArchiveError::Timeout`] - Server did not respond in time
    pub async fn fetch_article(&self, number: u64) -> Result<Vec<u8>> {
        let slot = self.acquire().await?;
        fetch_with(slot, number).await
    }

    /// Like [`fetch_article`](Self::fetch_article) but never waits for the slot
    ///
    /// Fails with [`ArchiveError::Busy`] when another command is in flight.
    pub async fn try_fetch_article(&self, number: u64) -> Result<Vec<u8>> {
        let slot = self.try_acquire()?;
        fetch_with(slot, number).await
    }

    /// Fetch article `number` and hand its bytes to `decoder`
    pub async fn fetch_and_decode<D: MailDecoder>(
        &self,
        number: u64,
        decoder: &D,
    ) -> Result<ParsedMail> {
        let raw = self.fetch_article(number).await?;
        decoder.decode(&raw)
    }
}

async fn fetch_with(mut slot: SlotGuard<'_>, number: u64) -> Result<Vec<u8>> {
    if slot.current_group.is_none() {
        return Err(ArchiveError::NoGroupSelected);
    }

    trace!("Fetching article: {}", number);
    let response = slot
        .round_trip(Command::FetchArticle, Some(&number.to_string()))
        .await?;
    drop(slot);

    if !response.is_success() {
        return Err(commands::protocol_error(&response.status_line));
    }

    Ok(commands::article_payload(&response.bytes))
}
