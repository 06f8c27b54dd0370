//! Reassembly of articles split with `message/partial`
//!
//! A large article can be posted as `total` fragments sharing an `id`. Each
//! fragment is staged as two write-once artifacts (metadata and payload). Once all
//! of them are present, the payloads are concatenated in number order, decoded as
//! one message, and the artifacts are removed.

pub mod assembler;
pub mod staging;

pub use assembler::{FragmentMetadata, Reassembler, Reassembly};
pub use staging::{ArtifactKind, FsStaging, MemoryStaging, StagingKey, StagingStore};

use crate::mail::headers::parse_content_type;

/// Position of one fragment within a split article
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentDescriptor {
    /// Identity shared by all fragments of the article
    pub id: String,
    /// 1-based fragment number
    pub number: u32,
    /// Fragment count
    pub total: u32,
}

impl FragmentDescriptor {
    /// Parse a `Content-Type` value
    ///
    /// Returns `None` unless the media type is `message/partial` and `id`, `number`
    /// and `total` are present with `1 <= number <= total`.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let (media_type, params) = parse_content_type(value);
        if media_type != "message/partial" {
            return None;
        }

        let param = |name: &str| {
            params
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.trim())
        };

        let id = param("id").filter(|id| !id.is_empty())?;
        let number: u32 = param("number")?.parse().ok()?;
        let total: u32 = param("total")?.parse().ok()?;

        (number >= 1 && number <= total).then(|| FragmentDescriptor {
            id: id.to_string(),
            number,
            total,
        })
    }

    /// Staging key of this fragment's artifact of `kind`
    pub fn key(&self, kind: ArtifactKind) -> StagingKey {
        StagingKey::new(&self.id, self.number, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_from_content_type() {
        let fragment =
            FragmentDescriptor::from_content_type("message/partial; id=\"abc@x\"; number=2; total=3")
                .unwrap();
        assert_eq!(
            fragment,
            FragmentDescriptor {
                id: "abc@x".to_string(),
                number: 2,
                total: 3
            }
        );
    }

    #[test]
    fn test_invalid_fragments_rejected() {
        for value in [
            "text/plain; id=a; number=1; total=2",
            "message/partial; number=1; total=2",
            "message/partial; id=a; total=2",
            "message/partial; id=a; number=1",
            "message/partial; id=a; number=x; total=2",
            "message/partial; id=a; number=0; total=2",
            "message/partial; id=a; number=3; total=2",
            "message/partial; id=\"\"; number=1; total=1",
        ] {
            assert_eq!(FragmentDescriptor::from_content_type(value), None, "{}", value);
        }
    }
}
