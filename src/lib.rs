#![doc = include_str!("../README.md")]

/// Usenet archiving worker
pub mod archiver;
/// Attachment records and checksums
pub mod attachment;
mod client;
/// NNTP command table and response parsers
pub mod commands;
mod config;
mod error;
/// Decoded articles and the MIME decode seam
pub mod mail;
/// `message/partial` reassembly
pub mod partial;
mod response;
/// Persistence seam
pub mod store;
/// Quoted-text truncation
pub mod truncate;
/// Inline uuencode extraction
pub mod uuencode;

pub use archiver::{ArticleOutcome, Archiver, GroupSyncReport};
pub use attachment::Attachment;
pub use client::{ConnectionState, NntpClient, NntpStream, ResponseAccumulator};
pub use commands::{Command, CommandDescriptor, GroupListing, GroupSelection, Terminator};
pub use config::{ArchiverConfig, DEFAULT_MAX_QUEUED_COMMANDS, ServerConfig};
pub use error::{ArchiveError, Result};
pub use mail::{DeclaredAttachment, MailDecoder, MailParserDecoder, Membership, ParsedMail};
pub use partial::{
    ArtifactKind, FragmentDescriptor, FsStaging, MemoryStaging, Reassembler, Reassembly,
    StagingKey, StagingStore,
};
pub use response::{FramedResponse, ResponseStatus};
pub use store::{ArticleRecord, ArticleStore, MemoryStore, RecordId};
pub use truncate::{Truncated, truncate_text};
pub use uuencode::{InlineExtraction, extract_inline_attachments};
