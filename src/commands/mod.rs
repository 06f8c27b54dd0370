//! NNTP command table and response parsers
//!
//! The archiver speaks exactly five commands. Each has a fixed
//! [`CommandDescriptor`]: the wire verb, the status code that means success, and
//! the byte sequence that ends a successful response.

// Module declarations
pub mod article;
pub mod group;
pub mod list;
pub mod response;

pub use article::*;
pub use group::*;
pub use list::*;
pub use response::*;

use crate::error::{ArchiveError, Result};

/// Single-line response terminator
pub const SINGLE_LINE_TERMINATOR: &[u8] = b"\r\n";

/// Multi-line response terminator
pub const MULTI_LINE_TERMINATOR: &[u8] = b"\r\n.\r\n";

/// How a successful response ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Status line only, ends at the first CRLF
    SingleLine,
    /// Status line plus dot-terminated body
    MultiLine,
}

impl Terminator {
    /// Terminator bytes on the wire
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::SingleLine => SINGLE_LINE_TERMINATOR,
            Terminator::MultiLine => MULTI_LINE_TERMINATOR,
        }
    }
}

/// Immutable description of one supported command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Wire verb; empty for the unsolicited greeting
    pub verb: &'static str,
    /// Status code that classifies the response as success
    pub success_code: &'static str,
    /// End of a successful response
    pub terminator: Terminator,
}

/// Commands supported by the archiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Server greeting after connect (nothing is sent)
    Greeting,
    /// LIST
    ListGroups,
    /// GROUP name
    SelectGroup,
    /// ARTICLE number
    FetchArticle,
    /// QUIT
    Quit,
}

const GREETING: CommandDescriptor = CommandDescriptor {
    verb: "",
    success_code: "200",
    terminator: Terminator::SingleLine,
};

const LIST_GROUPS: CommandDescriptor = CommandDescriptor {
    verb: "LIST",
    success_code: "215",
    terminator: Terminator::MultiLine,
};

const SELECT_GROUP: CommandDescriptor = CommandDescriptor {
    verb: "GROUP",
    success_code: "211",
    terminator: Terminator::SingleLine,
};

const FETCH_ARTICLE: CommandDescriptor = CommandDescriptor {
    verb: "ARTICLE",
    success_code: "220",
    terminator: Terminator::MultiLine,
};

const QUIT: CommandDescriptor = CommandDescriptor {
    verb: "QUIT",
    success_code: "205",
    terminator: Terminator::SingleLine,
};

impl Command {
    /// Descriptor from the fixed command table
    pub const fn descriptor(self) -> &'static CommandDescriptor {
        match self {
            Command::Greeting => &GREETING,
            Command::ListGroups => &LIST_GROUPS,
            Command::SelectGroup => &SELECT_GROUP,
            Command::FetchArticle => &FETCH_ARTICLE,
            Command::Quit => &QUIT,
        }
    }
}

impl CommandDescriptor {
    /// Build the request line for this command
    ///
    /// Returns `None` for the greeting, which sends nothing. Arguments containing
    /// line breaks are rejected since they would desynchronise the session.
    pub fn request(&self, argument: Option<&str>) -> Result<Option<String>> {
        if self.verb.is_empty() {
            return Ok(None);
        }

        match argument {
            Some(arg) if arg.contains(['\r', '\n']) || arg.trim().is_empty() => {
                Err(ArchiveError::InvalidArgument(arg.escape_debug().to_string()))
            }
            Some(arg) => Ok(Some(format!("{} {}\r\n", self.verb, arg))),
            None => Ok(Some(format!("{}\r\n", self.verb))),
        }
    }
}
