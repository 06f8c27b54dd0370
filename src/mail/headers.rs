//! Raw header parsing
//!
//! The message-id, reference and routing headers are read straight from the raw
//! header block so their values (angle brackets included) survive exactly as sent.

/// Split a raw article into header block and body
///
/// Splits at the first blank line (CRLF CRLF or LF LF). Without a separator the
/// whole input is headers.
pub fn split_article(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        return (&raw[..pos], &raw[pos + 4..]);
    }
    if let Some(pos) = find(raw, b"\n\n") {
        return (&raw[..pos], &raw[pos + 2..]);
    }
    (raw, &[])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse comma-separated list (Newsgroups)
pub fn parse_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse whitespace-separated message-id list (References)
pub fn parse_message_id_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(|s| s.to_string()).collect()
}

/// Unfold header value by removing continuation line breaks
///
/// A line break followed by whitespace becomes a single space.
pub fn unfold_header(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut prev_was_newline = false;

    for ch in value.chars() {
        match ch {
            '\r' => {}
            '\n' => prev_was_newline = true,
            ' ' | '\t' if prev_was_newline => {
                if !result.ends_with(' ') {
                    result.push(' ');
                }
                prev_was_newline = false;
            }
            _ => {
                if prev_was_newline {
                    result.push(' ');
                }
                result.push(ch);
                prev_was_newline = false;
            }
        }
    }

    result.trim().to_string()
}

/// Parse a header block into `(lowercase name, unfolded value)` pairs, in order
///
/// Lines without a colon that are not continuations are ignored.
pub fn parse_headers(headers_text: &str) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    let mut current: Option<(String, String)> = None;

    for line in headers_text.lines() {
        if line.is_empty() {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = current.as_mut() {
                value.push('\n');
                value.push_str(line);
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.push((name, unfold_header(&value)));
        }

        if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_ascii_lowercase();
            let value = line[colon_pos + 1..].trim_start().to_string();
            if !name.is_empty() {
                current = Some((name, value));
            }
        }
    }

    if let Some((name, value)) = current {
        headers.push((name, unfold_header(&value)));
    }

    headers
}

/// Split a structured header value into its media type and parameters
///
/// `message/partial; id="abc"; number=1; total=2` yields
/// `("message/partial", [("id","abc"), ("number","1"), ("total","2")])`.
/// Parameter names are lowercased and surrounding quotes removed.
pub fn parse_content_type(value: &str) -> (String, Vec<(String, String)>) {
    let mut parts = split_params(value).into_iter();
    let media_type = parts
        .next()
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let params = parts
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.trim().to_ascii_lowercase(), value.to_string()))
        })
        .collect();

    (media_type, params)
}

// Semicolons inside quoted strings do not separate parameters
fn split_params(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, ch) in value.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}
