use crate::attachment::Attachment;
use std::ops::Range;

/// One decoded `begin`..`end` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuBlock {
    /// Octal permission bits from the begin line
    pub mode: String,
    /// File name from the begin line
    pub file_name: String,
    /// Decoded payload
    pub data: Vec<u8>,
}

/// Result of scanning a body for inline uuencoded blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineExtraction {
    /// Body with every matched block removed
    pub text: String,
    /// One attachment per non-empty block, in body order
    pub attachments: Vec<Attachment>,
    /// Byte ranges of the original body that were removed (`begin` through `end`)
    pub ranges: Vec<Range<usize>>,
}
