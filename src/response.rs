//! Framed NNTP responses

/// Classification of a completed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Status code matched the command's expected success code
    Success,
    /// Any other status code (single-line error reply)
    Error,
}

/// A complete response as cut by the framer
///
/// `bytes` holds the exact bytes received (status line through terminator), so
/// article payloads never pass through a text decoder. `text` is a lossy UTF-8 view
/// used for status and listing inspection.
#[derive(Debug, Clone)]
pub struct FramedResponse {
    /// Success or error classification
    pub status: ResponseStatus,
    /// First line of the response, without CRLF
    pub status_line: String,
    /// Whole response as text
    pub text: String,
    /// Whole response as received
    pub bytes: Vec<u8>,
}

impl FramedResponse {
    /// Check if the response carried the expected success code
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Numeric status code, if the status line starts with three digits
    pub fn code(&self) -> Option<u16> {
        let digits = self.status_line.get(..3)?;
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse().ok()
        } else {
            None
        }
    }
}
