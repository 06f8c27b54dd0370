//! Newsgroup listing (RFC 3977 Section 7.6.1)

use super::NntpClient;
use crate::commands::{self, Command, GroupListing};
use crate::error::Result;
use tracing::debug;

impl NntpClient {
    /// List the server's newsgroups
    ///
    /// Each body line of the `LIST` response becomes one [`GroupListing`]
    /// (`name last first flag`), in the order the server sent them.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - [`ArchiveError::Protocol`](crate::ArchiveError::Protocol) - Server answered with anything but 215
    /// - [`ArchiveError::Timeout`](crate::ArchiveError::Timeout) - Server did not respond in time
    pub async fn list_groups(&self) -> Result<Vec<GroupListing>> {
        debug!("Listing newsgroups");

        let response = {
            let mut slot = self.acquire().await?;
            slot.round_trip(Command::ListGroups, None).await?
        };

        if !response.is_success() {
            return Err(commands::protocol_error(&response.status_line));
        }

        let groups = commands::parse_group_listing(&response.text);
        debug!("Retrieved {} groups", groups.len());
        Ok(groups)
    }
}
