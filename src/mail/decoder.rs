use super::headers::{parse_headers, split_article};
use super::{DeclaredAttachment, MailDecoder, ParsedMail};
use crate::error::{ArchiveError, Result};
use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use tracing::trace;

/// [`MailDecoder`] backed by the `mail-parser` crate
///
/// Routing headers come from the raw header block. Subject, sender and date are
/// decoded by `mail-parser` (RFC 2047 words included), as are the text body and the
/// attachments. A `message/partial` fragment is not MIME-parsed: its whole body
/// becomes the single attachment, ready to be concatenated with its siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailParserDecoder;

impl MailParserDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl MailDecoder for MailParserDecoder {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMail> {
        let (header_bytes, body) = split_article(raw);
        let mut mail = ParsedMail::from_headers(parse_headers(&String::from_utf8_lossy(
            header_bytes,
        )));

        if mail.fragment().is_some() {
            trace!("Fragment body of {} bytes kept as raw payload", body.len());
            mail.attachments.push(DeclaredAttachment {
                file_name: None,
                content_type: "message/partial".to_string(),
                payload: body.to_vec(),
            });
            return Ok(mail);
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| ArchiveError::Decode("message could not be parsed".to_string()))?;

        if let Some(subject) = message.subject() {
            mail.subject = Some(subject.to_string());
        }
        if let Some(addr) = message.from().and_then(|from| from.first()) {
            mail.from = match (addr.name(), addr.address()) {
                (Some(name), Some(address)) => Some(format!("{} <{}>", name, address)),
                (None, Some(address)) => Some(address.to_string()),
                (Some(name), None) => Some(name.to_string()),
                (None, None) => mail.from.take(),
            };
        }
        mail.date = message
            .date()
            .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
            .map(|d| d.with_timezone(&Utc));
        mail.text = message
            .body_text(0)
            .map(|text| text.into_owned())
            .unwrap_or_default();

        mail.attachments = message
            .attachments()
            .map(|part| DeclaredAttachment {
                file_name: part.attachment_name().map(str::to_string),
                content_type: part
                    .content_type()
                    .map(|ct| match ct.subtype() {
                        Some(sub) => format!("{}/{}", ct.ctype(), sub),
                        None => ct.ctype().to_string(),
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                payload: part.contents().to_vec(),
            })
            .collect();

        Ok(mail)
    }
}
