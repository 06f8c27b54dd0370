//! Fragment fan-in

use super::FragmentDescriptor;
use super::staging::{ArtifactKind, StagingStore};
use crate::attachment::{Attachment, AttachmentInfo};
use crate::error::{ArchiveError, Result};
use crate::mail::{MailDecoder, ParsedMail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What a fragment's metadata artifact records about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    /// `Message-ID` of the fragment post
    pub article_id: Option<String>,
    pub subject: Option<String>,
    pub headers: Vec<(String, String)>,
    pub text: String,
    pub attachments: Vec<AttachmentInfo>,
    /// Raw `Xref` value
    pub xref: Option<String>,
}

impl FragmentMetadata {
    pub fn from_mail(mail: &ParsedMail) -> Self {
        Self {
            article_id: mail.message_id.clone(),
            subject: mail.subject.clone(),
            headers: mail.headers.clone(),
            text: mail.text.clone(),
            attachments: mail
                .attachments
                .iter()
                .cloned()
                .map(|declared| Attachment::from(declared).info())
                .collect(),
            xref: mail.xref.clone(),
        }
    }
}

/// Outcome of offering a mail to the [`Reassembler`]
#[derive(Debug, Clone, PartialEq)]
pub enum Reassembly {
    /// Some fragments are still missing
    Pending {
        /// Fragments with both artifacts staged
        arrived: u32,
        total: u32,
    },
    /// The mail to archive: either not a fragment at all, or the rebuilt article
    Complete(Box<ParsedMail>),
}

/// Stages fragments and rebuilds the article once all of them are present
pub struct Reassembler<S, D> {
    staging: S,
    decoder: D,
}

impl<S: StagingStore, D: MailDecoder> Reassembler<S, D> {
    pub fn new(staging: S, decoder: D) -> Self {
        Self { staging, decoder }
    }

    pub fn staging(&self) -> &S {
        &self.staging
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Pass non-fragments through; stage fragments and try to complete their set
    pub async fn accept(&self, mail: ParsedMail) -> Result<Reassembly> {
        let Some(fragment) = mail.fragment() else {
            return Ok(Reassembly::Complete(Box::new(mail)));
        };

        self.stage(&fragment, &mail).await?;
        self.try_complete(&fragment).await
    }

    /// Write both artifacts of one fragment
    ///
    /// The payload is the concatenation of the fragment's declared attachments and
    /// is written even when empty, so that the set can complete. Artifacts already
    /// staged by an earlier run are kept as they are.
    pub async fn stage(&self, fragment: &FragmentDescriptor, mail: &ParsedMail) -> Result<()> {
        let payload: Vec<u8> = mail
            .attachments
            .iter()
            .flat_map(|a| a.payload.iter().copied())
            .collect();
        let metadata = serde_json::to_vec_pretty(&FragmentMetadata::from_mail(mail))?;

        let blob_written = self
            .staging
            .put(&fragment.key(ArtifactKind::Attachment), &payload)
            .await?;
        let meta_written = self
            .staging
            .put(&fragment.key(ArtifactKind::Metadata), &metadata)
            .await?;

        debug!(
            "Staged fragment {}/{} of {} (payload {} bytes, new: {}/{})",
            fragment.number,
            fragment.total,
            fragment.id,
            payload.len(),
            blob_written,
            meta_written
        );
        Ok(())
    }

    async fn has_both(&self, fragment: &FragmentDescriptor, number: u32) -> Result<bool> {
        let probe = FragmentDescriptor {
            number,
            ..fragment.clone()
        };
        Ok(self.staging.exists(&probe.key(ArtifactKind::Attachment)).await?
            && self.staging.exists(&probe.key(ArtifactKind::Metadata)).await?)
    }

    /// Rebuild the article of `fragment`'s set if every fragment is staged
    ///
    /// Concatenates the payloads in number order and decodes the result. The
    /// `Message-ID` comes from fragment 1's metadata and `Xref` becomes the union of
    /// all fragments' tokens in first-seen order. All `2 * total` artifacts are
    /// deleted afterwards. A set found incomplete, including one whose artifacts
    /// disappear while being read, is reported as pending.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::ReassemblyIdentityMissing`] - fragment 1 has no article id;
    ///   the artifacts are left in place
    /// - [`ArchiveError::Decode`] - the combined bytes do not decode
    pub async fn try_complete(&self, fragment: &FragmentDescriptor) -> Result<Reassembly> {
        let total = fragment.total;

        let mut arrived = 0;
        for number in 1..=total {
            if self.has_both(fragment, number).await? {
                arrived += 1;
            }
        }
        if arrived < total {
            debug!("Fragment set {}: {}/{} staged", fragment.id, arrived, total);
            return Ok(Reassembly::Pending { arrived, total });
        }

        let mut combined = Vec::new();
        let mut metadata = Vec::with_capacity(total as usize);
        for number in 1..=total {
            let part = FragmentDescriptor {
                number,
                ..fragment.clone()
            };
            let (Some(blob), Some(meta)) = (
                self.staging.get(&part.key(ArtifactKind::Attachment)).await?,
                self.staging.get(&part.key(ArtifactKind::Metadata)).await?,
            ) else {
                debug!("Fragment set {} changed while reading", fragment.id);
                return Ok(Reassembly::Pending {
                    arrived: total - 1,
                    total,
                });
            };
            combined.extend_from_slice(&blob);
            metadata.push(serde_json::from_slice::<FragmentMetadata>(&meta)?);
        }

        let identity = metadata
            .first()
            .and_then(|m| m.article_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ArchiveError::ReassemblyIdentityMissing(fragment.id.clone()))?;

        let mut mail = self.decoder.decode(&combined)?;

        let mut memberships: Vec<String> = Vec::new();
        for token in metadata
            .iter()
            .filter_map(|m| m.xref.as_deref())
            .flat_map(str::split_whitespace)
        {
            if !memberships.iter().any(|seen| seen == token) {
                memberships.push(token.to_string());
            }
        }
        if memberships.is_empty() {
            warn!("Reassembled article {} carries no Xref membership", identity);
        }
        mail.set_xref(&memberships);
        mail.set_header("message-id", identity.clone());
        mail.message_id = Some(identity.clone());

        for number in 1..=total {
            let part = FragmentDescriptor {
                number,
                ..fragment.clone()
            };
            self.staging.delete(&part.key(ArtifactKind::Metadata)).await?;
            self.staging.delete(&part.key(ArtifactKind::Attachment)).await?;
        }

        info!(
            "Reassembled {} from {} fragments ({} bytes)",
            identity,
            total,
            combined.len()
        );
        Ok(Reassembly::Complete(Box::new(mail)))
    }
}
