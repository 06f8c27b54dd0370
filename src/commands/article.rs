//! ARTICLE response slicing

use super::response::unstuff;
use super::{MULTI_LINE_TERMINATOR, SINGLE_LINE_TERMINATOR};

/// Extract the raw article from a complete ARTICLE response
///
/// Returns the bytes after the status line up to (and including the CRLF of) the
/// last article line, with dot-stuffing removed. The bytes are never decoded as
/// text, so 8-bit article content survives untouched.
pub fn article_payload(response: &[u8]) -> Vec<u8> {
    let Some(status_end) = find(response, SINGLE_LINE_TERMINATOR) else {
        return Vec::new();
    };
    let body_start = status_end + SINGLE_LINE_TERMINATOR.len();

    let body_end = match rfind(response, MULTI_LINE_TERMINATOR) {
        // keep the CRLF that ends the final article line
        Some(pos) if pos + SINGLE_LINE_TERMINATOR.len() > body_start => {
            pos + SINGLE_LINE_TERMINATOR.len()
        }
        Some(_) => return Vec::new(),
        None => response.len(),
    };

    unstuff(&response[body_start..body_end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_payload() {
        let response = b"220 3 <id@x> article\r\nSubject: hi\r\n\r\nbody\r\n.\r\n";
        assert_eq!(article_payload(response), b"Subject: hi\r\n\r\nbody\r\n");
    }

    #[test]
    fn test_article_payload_binary_preserved() {
        let mut response = b"220 1 <a@b>\r\nX: y\r\n\r\n".to_vec();
        response.extend_from_slice(&[0xE9, 0xFF, 0x00, b'\r', b'\n']);
        response.extend_from_slice(b".\r\n");

        let payload = article_payload(&response);
        assert_eq!(&payload[payload.len() - 5..], &[0xE9, 0xFF, 0x00, b'\r', b'\n']);
    }

    #[test]
    fn test_article_payload_unstuffs() {
        let response = b"220 1 <a@b>\r\nX: y\r\n\r\n..dotted\r\n.\r\n";
        assert_eq!(article_payload(response), b"X: y\r\n\r\n.dotted\r\n");
    }

    #[test]
    fn test_article_payload_empty_body() {
        assert!(article_payload(b"220 1 <a@b>\r\n.\r\n").is_empty());
    }
}
