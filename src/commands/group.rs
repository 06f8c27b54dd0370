//! GROUP response parsing

use crate::error::{ArchiveError, Result};

/// Group information returned by a successful GROUP command
///
/// Status line format: `211 totalEstimate first last name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSelection {
    /// Status code as sent ("211")
    pub status_code: String,
    /// Estimated number of articles in the group
    pub total_estimate: u64,
    /// Number of the first article
    pub first: u64,
    /// Number of the last article
    pub last: u64,
    /// Group name as echoed by the server
    pub group_name: String,
}

/// Parse the status line of a successful GROUP response
///
/// Exactly five whitespace-separated tokens are required.
pub fn parse_group_selection(status_line: &str) -> Result<GroupSelection> {
    let parts: Vec<&str> = status_line.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(ArchiveError::MalformedResponse(status_line.to_string()));
    }

    let number = |token: &str| -> Result<u64> {
        token
            .parse()
            .map_err(|_| ArchiveError::MalformedResponse(status_line.to_string()))
    };

    Ok(GroupSelection {
        status_code: parts[0].to_string(),
        total_estimate: number(parts[1])?,
        first: number(parts[2])?,
        last: number(parts[3])?,
        group_name: parts[4].to_string(),
    })
}
