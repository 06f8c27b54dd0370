use crate::commands::{self, Command, GroupSelection};
use crate::{NntpClient, Result};
use tracing::debug;

impl NntpClient {
    /// Select a newsgroup
    ///
    /// Returns [`GroupSelection`] with the article estimate and number range. The
    /// group is remembered only when the server accepts it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - [`ArchiveError::Protocol`](crate::ArchiveError::Protocol) - Server answered with anything but 211 (e.g. 411 no such group)
    /// - [`ArchiveError::MalformedResponse`](crate::ArchiveError::MalformedResponse) - The 211 line did not carry five tokens
    /// - [`ArchiveError::Timeout`](crate::ArchiveError::Timeout) - Server did not respond in time
    pub async fn select_group(&self, newsgroup: &str) -> Result<GroupSelection> {
        debug!("Selecting newsgroup: {}", newsgroup);

        let mut slot = self.acquire().await?;
        let response = slot.round_trip(Command::SelectGroup, Some(newsgroup)).await?;

        if !response.is_success() {
            return Err(commands::protocol_error(&response.status_line));
        }

        let info = commands::parse_group_selection(&response.status_line)?;
        slot.current_group = Some(newsgroup.to_string());

        debug!(
            "Group {} selected: ~{} articles ({}-{})",
            newsgroup, info.total_estimate, info.first, info.last
        );
        Ok(info)
    }
}
