//! uuencode extraction for Usenet article bodies
//!
//! Older posts embed binaries directly in the text body between a
//! `begin <mode> <name>` line and an `end` line. Each data line starts with a
//! length character followed by groups of four printable characters, each group
//! carrying three bytes.

pub mod decode;
pub mod encode;
pub mod types;

pub use decode::{decode_line, extract_inline_attachments};
pub use encode::encode;
pub use types::{InlineExtraction, UuBlock};
