/// Bytes carried by one full data line
const LINE_BYTES: usize = 45;

/// uuencode `data` as a `begin`..`end` block
///
/// Zero values are written as a backtick rather than a space so lines survive
/// whitespace trimming. The block ends with the `end` line and no trailing line
/// break.
pub fn encode(data: &[u8], file_name: &str, mode: &str) -> String {
    let mut out = format!("begin {} {}\n", mode, file_name);

    for chunk in data.chunks(LINE_BYTES) {
        out.push(encode_char(chunk.len() as u8));
        for group in chunk.chunks(3) {
            let b = [
                group[0],
                group.get(1).copied().unwrap_or(0),
                group.get(2).copied().unwrap_or(0),
            ];
            out.push(encode_char(b[0] >> 2));
            out.push(encode_char(((b[0] & 0x03) << 4) | (b[1] >> 4)));
            out.push(encode_char(((b[1] & 0x0F) << 2) | (b[2] >> 6)));
            out.push(encode_char(b[2] & 0x3F));
        }
        out.push('\n');
    }

    out.push_str("`\nend");
    out
}

fn encode_char(value: u8) -> char {
    if value == 0 {
        '`'
    } else {
        (value + 32) as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_value() {
        assert_eq!(encode(b"Cat", "cat.txt", "644"), "begin 644 cat.txt\n#0V%T\n`\nend");
    }

    #[test]
    fn test_encode_full_line_length() {
        let encoded = encode(&[0xAB; 45], "x", "644");
        let data_line = encoded.lines().nth(1).unwrap();
        assert!(data_line.starts_with('M'));
        assert_eq!(data_line.len(), 61);
    }
}
