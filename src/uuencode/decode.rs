use super::types::{InlineExtraction, UuBlock};
use crate::attachment::{Attachment, OCTET_STREAM};
use std::ops::Range;
use tracing::{debug, warn};

/// Decode one data line
///
/// The first character encodes the byte count, `(c - 32) & 63`. Every following
/// group of four characters yields three bytes; decoding stops at the declared
/// count. A short final group is padded with zero values, so lines whose trailing
/// spaces were stripped in transit still decode.
pub fn decode_line(line: &str) -> Vec<u8> {
    let bytes = line.as_bytes();
    let Some(&first) = bytes.first() else {
        return Vec::new();
    };
    let length = sixbit(first) as usize;
    let mut out = Vec::with_capacity(length);

    for group in bytes[1..].chunks(4) {
        if out.len() >= length {
            break;
        }
        let mut v = [0u8; 4];
        for (slot, &c) in v.iter_mut().zip(group) {
            *slot = sixbit(c);
        }

        let decoded = [
            (v[0] << 2) | (v[1] >> 4),
            ((v[1] & 0x0F) << 4) | (v[2] >> 2),
            ((v[2] & 0x03) << 6) | v[3],
        ];
        for byte in decoded {
            if out.len() < length {
                out.push(byte);
            }
        }
    }

    out
}

fn sixbit(c: u8) -> u8 {
    c.wrapping_sub(32) & 0x3F
}

// Data lines start with a character from the uuencode alphabet (' ' through '`')
fn is_data_line(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b' '..=b'`'))
}

/// Parse `begin <octal mode> <name>`; the name is the rest of the line
fn parse_begin(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("begin")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }

    let (mode, name) = rest.trim_start().split_once([' ', '\t'])?;
    if mode.is_empty() || !mode.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let name = name.trim();
    (!name.is_empty()).then(|| (mode.to_string(), name.to_string()))
}

struct OpenBlock {
    start: usize,
    mode: String,
    file_name: String,
    data: Vec<u8>,
}

/// Find every terminated block, with the byte range it occupies in `text`
///
/// The range runs from the start of the begin line to the end of the `end` line,
/// excluding its line feed. A block without an `end` line is ignored, as is a
/// `begin` line inside an open block.
fn scan_blocks(text: &str) -> Vec<(Range<usize>, UuBlock)> {
    let mut found = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut offset = 0;

    for raw_line in text.split_inclusive('\n') {
        let start = offset;
        offset += raw_line.len();
        let without_lf = raw_line.strip_suffix('\n').unwrap_or(raw_line);
        let line = without_lf.strip_suffix('\r').unwrap_or(without_lf);

        match open.take() {
            None => {
                if let Some((mode, file_name)) = parse_begin(line) {
                    open = Some(OpenBlock {
                        start,
                        mode,
                        file_name,
                        data: Vec::new(),
                    });
                }
            }
            Some(block) if line.trim() == "end" => {
                found.push((
                    block.start..start + without_lf.len(),
                    UuBlock {
                        mode: block.mode,
                        file_name: block.file_name,
                        data: block.data,
                    },
                ));
            }
            Some(mut block) => {
                if parse_begin(line).is_some() {
                    debug!("Ignoring nested begin line inside {}", block.file_name);
                } else if is_data_line(line) {
                    block.data.extend(decode_line(line));
                }
                open = Some(block);
            }
        }
    }

    if let Some(block) = open {
        warn!("uuencoded block {} has no end line, left in text", block.file_name);
    }

    found
}

/// Pull every inline uuencoded file out of an article body
///
/// Each non-empty block becomes an `application/octet-stream` attachment. The
/// matched ranges are removed from the text whether or not they decoded to any
/// bytes.
pub fn extract_inline_attachments(text: &str) -> InlineExtraction {
    let scanned = scan_blocks(text);

    let mut remaining = text.to_string();
    for (range, _) in scanned.iter().rev() {
        remaining.replace_range(range.clone(), "");
    }

    let mut ranges = Vec::with_capacity(scanned.len());
    let mut attachments = Vec::new();
    for (range, block) in scanned {
        ranges.push(range);
        if block.data.is_empty() {
            debug!("Discarding empty uuencoded block {}", block.file_name);
            continue;
        }
        attachments.push(Attachment::new(
            Some(block.file_name),
            OCTET_STREAM,
            block.data,
        ));
    }

    InlineExtraction {
        text: remaining,
        attachments,
        ranges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::md5_hex;
    use crate::uuencode::encode;

    #[test]
    fn test_decode_line_known_value() {
        // "Cat" encodes to "#0V%T"
        assert_eq!(decode_line("#0V%T"), b"Cat");
        assert_eq!(decode_line("`"), b"");
        assert_eq!(decode_line(""), b"");
    }

    #[test]
    fn test_decode_line_stripped_padding() {
        // One byte 0x41 encodes as "!00``"; trailing characters past the count are ignored
        assert_eq!(decode_line("!00``"), vec![0x41]);
        assert_eq!(decode_line("!05"), vec![0x41]);
    }

    #[test]
    fn test_parse_begin() {
        assert_eq!(
            parse_begin("begin 644 my file.txt"),
            Some(("644".to_string(), "my file.txt".to_string()))
        );
        assert_eq!(parse_begin("begin 644"), None);
        assert_eq!(parse_begin("begin abc x"), None);
        assert_eq!(parse_begin("beginning 644 x"), None);
    }

    #[test]
    fn test_round_trip_lengths() {
        for len in [1usize, 2, 3, 4, 44, 45, 46, 90, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let body = format!("Here you go:\n{}\nbye", encode(&data, "f.bin", "644"));
            let extraction = extract_inline_attachments(&body);
            assert_eq!(extraction.attachments.len(), 1, "len {}", len);
            let attachment = &extraction.attachments[0];
            assert_eq!(attachment.payload, data, "len {}", len);
            assert_eq!(attachment.byte_size, len);
            assert_eq!(attachment.checksum, md5_hex(&data));
            assert_eq!(attachment.file_name, "f.bin");
            assert_eq!(attachment.content_type, OCTET_STREAM);
        }
    }

    #[test]
    fn test_multiple_blocks_removed() {
        let body = format!(
            "intro\n{}\nmiddle\n{}\noutro",
            encode(b"first", "a.bin", "644"),
            encode(b"second", "b.bin", "600")
        );
        let extraction = extract_inline_attachments(&body);
        assert_eq!(extraction.attachments.len(), 2);
        assert_eq!(extraction.attachments[0].payload, b"first");
        assert_eq!(extraction.attachments[1].payload, b"second");
        assert_eq!(extraction.text, "intro\n\nmiddle\n\noutro");
        assert_eq!(extraction.ranges.len(), 2);
    }

    #[test]
    fn test_single_block_keeps_surrounding_text() {
        let body = format!("hello\n{}\nworld", encode(b"xyz", "c.bin", "644"));
        let extraction = extract_inline_attachments(&body);
        assert_eq!(extraction.text, "hello\n\nworld");
    }

    #[test]
    fn test_empty_block_discarded_but_removed() {
        let body = "a\nbegin 644 empty.bin\n`\nend\nb";
        let extraction = extract_inline_attachments(body);
        assert!(extraction.attachments.is_empty());
        assert_eq!(extraction.text, "a\n\nb");
    }

    #[test]
    fn test_unterminated_block_left_alone() {
        let body = "a\nbegin 644 x.bin\n#0V%T\n";
        let extraction = extract_inline_attachments(body);
        assert!(extraction.attachments.is_empty());
        assert_eq!(extraction.text, body);
        assert!(extraction.ranges.is_empty());
    }

    #[test]
    fn test_crlf_body() {
        let body = "x\r\nbegin 644 c.txt\r\n#0V%T\r\n`\r\nend\r\ny";
        let extraction = extract_inline_attachments(body);
        assert_eq!(extraction.attachments[0].payload, b"Cat");
        assert_eq!(extraction.text, "x\r\n\ny");
        assert_eq!(scan_blocks(body)[0].1.mode, "644");
    }
}
