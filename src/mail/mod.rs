//! Decoded article representation and the MIME decode seam
//!
//! The pipeline only ever sees [`ParsedMail`]; how raw bytes become one is the
//! business of a [`MailDecoder`]. [`MailParserDecoder`] is the stock
//! implementation.

mod decoder;
pub mod headers;

pub use decoder::MailParserDecoder;

use crate::error::Result;
use crate::partial::FragmentDescriptor;
use chrono::{DateTime, Utc};

/// Turns raw article bytes into a structured mail
pub trait MailDecoder {
    /// Decode one article (headers and body, dot-stuffing already removed)
    fn decode(&self, raw: &[u8]) -> Result<ParsedMail>;
}

impl<D: MailDecoder + ?Sized> MailDecoder for &D {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMail> {
        (**self).decode(raw)
    }
}

/// An attachment as declared by the MIME structure of an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredAttachment {
    /// File name from the part headers, if any
    pub file_name: Option<String>,
    /// Media type of the part (e.g. `image/png`)
    pub content_type: String,
    /// Decoded part content
    pub payload: Vec<u8>,
}

/// One `group:number` entry of the `Xref` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Membership {
    /// Newsgroup name
    pub group: String,
    /// Article number within that group
    pub number: u64,
}

/// A decoded article
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMail {
    /// Header fields in order, names lowercased
    pub headers: Vec<(String, String)>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// `Message-ID`, angle brackets kept
    pub message_id: Option<String>,
    /// `Newsgroups`, split on commas
    pub newsgroups: Vec<String>,
    /// Raw `Xref` value
    pub xref: Option<String>,
    /// `References`, oldest first
    pub references: Vec<String>,
    pub in_reply_to: Option<String>,
    /// Plain-text body
    pub text: String,
    pub attachments: Vec<DeclaredAttachment>,
}

impl ParsedMail {
    /// Build a mail whose routing fields are read from `headers`
    pub fn from_headers(headers: Vec<(String, String)>) -> Self {
        let mut mail = ParsedMail {
            headers,
            ..Default::default()
        };
        mail.message_id = mail.header("message-id").map(str::to_string);
        mail.newsgroups = mail
            .header("newsgroups")
            .map(headers::parse_comma_list)
            .unwrap_or_default();
        mail.xref = mail.header("xref").map(str::to_string);
        mail.references = mail
            .header("references")
            .map(headers::parse_message_id_list)
            .unwrap_or_default();
        mail.in_reply_to = mail
            .header("in-reply-to")
            .and_then(|v| v.split_whitespace().next())
            .map(str::to_string);
        mail.subject = mail.header("subject").map(str::to_string);
        mail.from = mail.header("from").map(str::to_string);
        mail
    }

    /// First value of header `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace header `name`, or append it when absent
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.headers.push((name.to_ascii_lowercase(), value)),
        }
    }

    /// Overwrite the `Xref` header and field with the given tokens
    pub fn set_xref(&mut self, tokens: &[String]) {
        let joined = tokens.join(" ");
        self.set_header("xref", joined.clone());
        self.xref = Some(joined);
    }

    /// Whitespace-separated tokens of `Xref`
    pub fn xref_tokens(&self) -> Vec<String> {
        self.xref
            .as_deref()
            .map(|x| x.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Group memberships recorded in `Xref`
    ///
    /// The leading server token and anything without a numeric article number is
    /// ignored.
    pub fn memberships(&self) -> Vec<Membership> {
        self.xref_tokens()
            .iter()
            .filter_map(|token| {
                let (group, number) = token.split_once(':')?;
                let number = number.parse().ok()?;
                (!group.is_empty()).then(|| Membership {
                    group: group.to_string(),
                    number,
                })
            })
            .collect()
    }

    /// Fragment descriptor when this mail is one piece of a split article
    pub fn fragment(&self) -> Option<FragmentDescriptor> {
        FragmentDescriptor::from_content_type(self.header("content-type")?)
    }

    /// An article with no references starts a thread
    pub fn is_root(&self) -> bool {
        self.references.is_empty()
    }

    /// Direct parent: `In-Reply-To`, else the last reference
    pub fn parent(&self) -> Option<&str> {
        self.in_reply_to
            .as_deref()
            .or_else(|| self.references.last().map(String::as_str))
    }

    /// Best guess at the thread root: the first reference
    pub fn guess_root(&self) -> Option<&str> {
        self.references.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(pairs: &[(&str, &str)]) -> ParsedMail {
        ParsedMail::from_headers(
            pairs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_routing_fields() {
        let mail = mail(&[
            ("message-id", "<c@x>"),
            ("newsgroups", "a.b, c.d"),
            ("references", "<a@x> <b@x>"),
            ("xref", "news.example.com a.b:10 c.d:7"),
        ]);
        assert_eq!(mail.message_id.as_deref(), Some("<c@x>"));
        assert_eq!(mail.newsgroups, vec!["a.b", "c.d"]);
        assert!(!mail.is_root());
        assert_eq!(mail.parent(), Some("<b@x>"));
        assert_eq!(mail.guess_root(), Some("<a@x>"));
        assert_eq!(
            mail.memberships(),
            vec![
                Membership {
                    group: "a.b".to_string(),
                    number: 10
                },
                Membership {
                    group: "c.d".to_string(),
                    number: 7
                },
            ]
        );
    }

    #[test]
    fn test_in_reply_to_wins_over_references() {
        let mail = mail(&[("references", "<a@x> <b@x>"), ("in-reply-to", "<z@x>")]);
        assert_eq!(mail.parent(), Some("<z@x>"));
    }

    #[test]
    fn test_root_article() {
        let mail = mail(&[("message-id", "<r@x>")]);
        assert!(mail.is_root());
        assert_eq!(mail.parent(), None);
        assert!(mail.memberships().is_empty());
    }

    #[test]
    fn test_set_xref_replaces_header() {
        let mut mail = mail(&[("xref", "host a.b:1")]);
        mail.set_xref(&["a.b:1".to_string(), "c.d:2".to_string()]);
        assert_eq!(mail.header("Xref"), Some("a.b:1 c.d:2"));
        assert_eq!(mail.memberships().len(), 2);
        assert_eq!(mail.headers.len(), 1);
    }
}
