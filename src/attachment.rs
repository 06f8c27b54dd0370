//! Binary attachments extracted from articles

use crate::mail::DeclaredAttachment;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Media type given to payloads whose type is unknown
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A binary payload ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    /// Payload length in bytes
    pub byte_size: usize,
    /// Lowercase hex MD5 of the payload
    pub checksum: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

/// Attachment description without the payload, as kept in staging metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub file_name: String,
    pub byte_size: usize,
    pub checksum: String,
    pub content_type: String,
}

/// Lowercase hex MD5 digest
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

impl Attachment {
    /// Build an attachment, computing size and checksum from the payload
    ///
    /// A missing or blank name is replaced by a random UUID.
    pub fn new(
        file_name: Option<String>,
        content_type: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            file_name,
            byte_size: payload.len(),
            checksum: md5_hex(&payload),
            content_type: content_type.into(),
            payload,
        }
    }

    pub fn info(&self) -> AttachmentInfo {
        AttachmentInfo {
            file_name: self.file_name.clone(),
            byte_size: self.byte_size,
            checksum: self.checksum.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

impl From<DeclaredAttachment> for Attachment {
    fn from(declared: DeclaredAttachment) -> Self {
        Attachment::new(declared.file_name, declared.content_type, declared.payload)
    }
}
