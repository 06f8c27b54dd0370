//! Per-article pipeline: fetch, decode, reassemble, extract, truncate, persist

use super::Archiver;
use crate::attachment::Attachment;
use crate::client::NntpClient;
use crate::error::Result;
use crate::mail::{MailDecoder, Membership, ParsedMail};
use crate::partial::{Reassembly, StagingStore};
use crate::store::{ArticleRecord, ArticleStore, RecordId};
use crate::truncate::truncate_text;
use crate::uuencode::extract_inline_attachments;
use tracing::{debug, info, warn};

/// What happened to one article number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    /// Persisted under this record id
    Archived(RecordId),
    /// Already linked to this group number
    AlreadyKnown,
    /// The group has no store record
    GroupUnknown,
    /// A fragment was staged; its article is not complete yet
    Pending,
    /// Fetch, decode or reassembly failed for this article only
    Skipped(String),
}

impl<S, T, D> Archiver<S, T, D>
where
    S: ArticleStore,
    T: StagingStore,
    D: MailDecoder,
{
    /// Run one article through the whole pipeline
    ///
    /// # Errors
    ///
    /// Connection failures and store or staging failures are returned. A refused
    /// GROUP, protocol, decode and reassembly-identity failures only skip the
    /// article.
    pub async fn process_article(
        &self,
        client: &NntpClient,
        group: &str,
        number: u64,
    ) -> Result<ArticleOutcome> {
        if self.store.resolve_group_id(group).await?.is_none() {
            warn!("Group {} not found in store", group);
            return Ok(ArticleOutcome::GroupUnknown);
        }

        if self.store.has_article(group, number).await? {
            debug!("Article {}:{} already archived", group, number);
            return Ok(ArticleOutcome::AlreadyKnown);
        }

        let fetched = match self.ensure_selected(client, group).await {
            Ok(()) => match client.fetch_article(number).await {
                Ok(raw) => self.reassembler.decoder().decode(&raw),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        let mail = match fetched {
            Ok(mail) => mail,
            Err(e) if e.is_skippable() => {
                warn!("Skipping article {}:{}: {}", group, number, e);
                return Ok(ArticleOutcome::Skipped(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let mail = match self.reassembler.accept(mail).await {
            Ok(Reassembly::Complete(mail)) => *mail,
            Ok(Reassembly::Pending { arrived, total }) => {
                debug!(
                    "Article {}:{} is fragment of an incomplete set ({}/{})",
                    group, number, arrived, total
                );
                return Ok(ArticleOutcome::Pending);
            }
            Err(e) if e.is_skippable() => {
                warn!("Skipping article {}:{}: {}", group, number, e);
                return Ok(ArticleOutcome::Skipped(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let id = self.persist(mail, group, number).await?;
        Ok(ArticleOutcome::Archived(id))
    }

    async fn ensure_selected(&self, client: &NntpClient, group: &str) -> Result<()> {
        if client.current_group().await.as_deref() != Some(group) {
            client.select_group(group).await?;
        }
        Ok(())
    }

    async fn persist(&self, mut mail: ParsedMail, group: &str, number: u64) -> Result<RecordId> {
        let mut attachments: Vec<Attachment> = std::mem::take(&mut mail.attachments)
            .into_iter()
            .map(Attachment::from)
            .collect();

        let extraction = extract_inline_attachments(&mail.text);
        if !extraction.attachments.is_empty() {
            debug!(
                "Extracted {} inline attachment(s) from {}:{}",
                extraction.attachments.len(),
                group,
                number
            );
        }
        attachments.extend(extraction.attachments);
        let text = extraction.text.trim().to_string();

        let (group_ids, parent, references) = tokio::join!(
            self.store.resolve_group_ids(&mail.newsgroups),
            async {
                match mail.parent() {
                    Some(parent) => self.store.resolve_article_id(parent).await,
                    None => Ok(None),
                }
            },
            self.store.resolve_article_ids(&mail.references),
        );

        let is_root = mail.is_root();
        let truncated = truncate_text(&text, is_root);

        let record = ArticleRecord {
            article_id: mail.message_id.clone(),
            subject: mail.subject.clone(),
            from: mail.from.clone(),
            date: mail.date,
            headers: mail.headers.clone(),
            text: truncated.text,
            is_root,
            is_truncated: truncated.is_truncated,
            full_text: truncated.full_text,
            groups: group_ids?,
            references: references?,
            parent: parent?,
            guess_root_id: mail.guess_root().map(str::to_string),
            attachments,
        };

        let id = self.store.create_article(record).await?;

        let mut memberships = mail.memberships();
        let here = Membership {
            group: group.to_string(),
            number,
        };
        if !memberships.contains(&here) {
            memberships.push(here);
        }
        for membership in &memberships {
            self.store
                .link_article_to_group_number(&id, &membership.group, membership.number)
                .await?;
        }

        info!(
            "Archived {}:{} as {} ({})",
            group,
            number,
            id,
            mail.message_id.as_deref().unwrap_or("no message-id")
        );
        Ok(id)
    }
}
