//! LIST response parsing

use super::response::unstuff;
use tracing::warn;

/// One newsgroup from a LIST response
///
/// Line format: `name last first flag`
/// Example: `comp.lang.rust 12345 1000 y`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupListing {
    /// Newsgroup name
    pub group: String,
    /// Highest article number
    pub last: u64,
    /// Lowest article number
    pub first: u64,
    /// Posting flag ("y", "n", "m", ...)
    pub flag: String,
}

/// Parse the body lines of a LIST response, in server order
///
/// `text` is the whole response including the status line and terminator. Lines
/// that do not carry four tokens with numeric bounds are skipped.
pub fn parse_group_listing(text: &str) -> Vec<GroupListing> {
    let unstuffed = unstuff(text.as_bytes());
    let body = String::from_utf8_lossy(&unstuffed);

    let mut groups = Vec::new();
    for line in body.split("\r\n").skip(1) {
        if line == "." {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 4 {
            warn!("Skipping malformed LIST line: {}", line);
            continue;
        }

        let (Ok(last), Ok(first)) = (parts[1].parse(), parts[2].parse()) else {
            warn!("Skipping LIST line with invalid bounds: {}", line);
            continue;
        };

        groups.push(GroupListing {
            group: parts[0].to_string(),
            last,
            first,
            flag: parts[3].to_string(),
        });
    }

    groups
}
