//! Core NNTP response parsing utilities

use crate::error::{ArchiveError, Result};

/// Parse NNTP response line into code and message
pub fn parse_response_line(line: &str) -> Result<(u16, String)> {
    // Strip UTF-8 BOM if present (some broken servers/proxies add it)
    let line = line.trim_start_matches('\u{FEFF}');

    let bytes = line.as_bytes();
    if bytes.len() < 3
        || !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || !bytes[2].is_ascii_digit()
    {
        return Err(ArchiveError::MalformedResponse(
            line.chars().take(100).collect(),
        ));
    }

    // "99999" must not be read as code 999
    if bytes.len() > 3 && bytes[3].is_ascii_digit() {
        return Err(ArchiveError::MalformedResponse(
            line.chars().take(100).collect(),
        ));
    }

    let code = line[0..3]
        .parse::<u16>()
        .map_err(|_| ArchiveError::MalformedResponse(line.chars().take(100).collect()))?;

    let message = if line.len() > 3 {
        if bytes[3] == b' ' {
            line[4..].to_string()
        } else {
            line[3..].to_string()
        }
    } else {
        String::new()
    };

    Ok((code, message))
}

/// Build the typed failure for a response that did not carry the expected code
///
/// The full status line is kept as the message. A status line that does not even
/// start with a code is reported as malformed.
pub fn protocol_error(status_line: &str) -> ArchiveError {
    match parse_response_line(status_line) {
        Ok((code, _)) => ArchiveError::Protocol {
            code,
            message: status_line.to_string(),
        },
        Err(e) => e,
    }
}

/// Remove NNTP dot-stuffing from a multi-line body ("..x" at line start becomes ".x")
pub fn unstuff(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut at_line_start = true;
    let mut i = 0;

    while i < body.len() {
        let byte = body[i];
        if at_line_start && byte == b'.' && body.get(i + 1) == Some(&b'.') {
            // drop the stuffing dot, keep the second one
            i += 1;
            continue;
        }
        out.push(byte);
        at_line_start = byte == b'\n';
        i += 1;
    }

    out
}
