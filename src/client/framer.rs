//! Response framing
//!
//! The framer decides, chunk by chunk, when the response to the in-flight command
//! is complete. It never looks at line boundaries: after every chunk it checks the
//! accumulated bytes as a whole.
//!
//! - code prefix matches and the command's terminator is a suffix: success
//! - code prefix does not match and a CRLF has been seen: error, even for commands
//!   whose success reply is multi-line
//! - anything else: wait for more data
//!
//! Classification only depends on the concatenated bytes, so the way the stream is
//! split into chunks never changes the outcome.

use crate::commands::{CommandDescriptor, SINGLE_LINE_TERMINATOR};
use crate::response::{FramedResponse, ResponseStatus};

/// Scratch state for exactly one outstanding command
///
/// Created when a command is issued and consumed when its response completes, so
/// nothing carries over from one command to the next.
#[derive(Debug)]
pub struct ResponseAccumulator {
    descriptor: &'static CommandDescriptor,
    bytes: Vec<u8>,
}

impl ResponseAccumulator {
    /// Start accumulating the response to `descriptor`
    pub fn new(descriptor: &'static CommandDescriptor) -> Self {
        Self {
            descriptor,
            bytes: Vec::new(),
        }
    }

    /// Bytes received so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True until the first byte arrives
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append a chunk and report the completed response, if any
    ///
    /// After a completion the accumulator is empty again.
    pub fn push(&mut self, chunk: &[u8]) -> Option<FramedResponse> {
        self.bytes.extend_from_slice(chunk);
        let status = self.classify()?;
        Some(self.finish(status))
    }

    fn classify(&self) -> Option<ResponseStatus> {
        let code_matches = self
            .bytes
            .starts_with(self.descriptor.success_code.as_bytes());

        if code_matches {
            if self.bytes.ends_with(self.descriptor.terminator.as_bytes()) {
                return Some(ResponseStatus::Success);
            }
            return None;
        }

        // A prefix of the expected code may still turn into a match
        let partial_code = self.bytes.len() < self.descriptor.success_code.len()
            && self
                .descriptor
                .success_code
                .as_bytes()
                .starts_with(&self.bytes);

        if !partial_code && contains(&self.bytes, SINGLE_LINE_TERMINATOR) {
            return Some(ResponseStatus::Error);
        }

        None
    }

    fn finish(&mut self, status: ResponseStatus) -> FramedResponse {
        let bytes = std::mem::take(&mut self.bytes);
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let status_line = text
            .split("\r\n")
            .next()
            .unwrap_or_default()
            .to_string();

        FramedResponse {
            status,
            status_line,
            text,
            bytes,
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    fn feed(command: Command, chunks: &[&[u8]]) -> Option<FramedResponse> {
        let mut accumulator = ResponseAccumulator::new(command.descriptor());
        let mut completed = None;
        for chunk in chunks {
            if let Some(response) = accumulator.push(chunk) {
                assert!(completed.is_none(), "completed twice");
                completed = Some(response);
            }
        }
        completed
    }

    #[test]
    fn test_single_line_success() {
        let response = feed(Command::SelectGroup, &[b"211 5 1 5 a.b\r\n"]).unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.status_line, "211 5 1 5 a.b");
    }

    #[test]
    fn test_multi_line_waits_for_terminator() {
        let mut accumulator = ResponseAccumulator::new(Command::ListGroups.descriptor());
        assert!(accumulator.push(b"215 list follows\r\n").is_none());
        assert!(accumulator.push(b"a.b 1 1 y\r\n").is_none());
        let response = accumulator.push(b".\r\n").unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert!(accumulator.is_empty());
    }

    #[test]
    fn test_error_short_circuits_multi_line() {
        let response = feed(Command::FetchArticle, &[b"423 no such article\r\n"]).unwrap();
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.status_line, "423 no such article");
    }

    #[test]
    fn test_error_waits_for_line_end() {
        let mut accumulator = ResponseAccumulator::new(Command::FetchArticle.descriptor());
        assert!(accumulator.push(b"4").is_none());
        assert!(accumulator.push(b"12 no group").is_none());
        let response = accumulator.push(b"\r\n").unwrap();
        assert_eq!(response.status, ResponseStatus::Error);
    }

    #[test]
    fn test_partial_code_is_not_an_error() {
        let mut accumulator = ResponseAccumulator::new(Command::Greeting.descriptor());
        assert!(accumulator.push(b"2").is_none());
        assert!(accumulator.push(b"0").is_none());
        let response = accumulator.push(b"0 welcome\r\n").unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
    }

    #[test]
    fn test_split_terminator() {
        let response = feed(
            Command::FetchArticle,
            &[b"220 1 <a@b>\r\nX: y\r\n\r\nbody\r", b"\n.", b"\r", b"\n"],
        )
        .unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert!(response.bytes.ends_with(b"body\r\n.\r\n"));
    }

    #[test]
    fn test_accumulator_reset_after_completion() {
        let mut accumulator = ResponseAccumulator::new(Command::Quit.descriptor());
        accumulator.push(b"205 bye\r\n").unwrap();
        assert_eq!(accumulator.len(), 0);
    }
}
