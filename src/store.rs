//! Persistence seam of the archiver
//!
//! [`ArticleStore`] is everything the pipeline needs from the database. Record ids
//! are opaque strings chosen by the store. [`MemoryStore`] keeps everything in
//! process, for tests and dry runs.

use crate::attachment::Attachment;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Opaque store identifier
pub type RecordId = String;

/// An article ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    /// `Message-ID`
    pub article_id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub headers: Vec<(String, String)>,
    /// Body after extraction and truncation
    pub text: String,
    pub is_root: bool,
    pub is_truncated: bool,
    /// Untruncated body, present only when `is_truncated`
    pub full_text: Option<String>,
    /// Records of the groups named in `Newsgroups`
    pub groups: Vec<RecordId>,
    /// Records of the referenced articles that are already archived
    pub references: Vec<RecordId>,
    pub parent: Option<RecordId>,
    /// First `References` entry, as sent
    pub guess_root_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Newsgroup bookkeeping kept by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: RecordId,
    pub name: String,
    pub first: u64,
    pub last: u64,
    /// Last article number processed
    pub cursor: u64,
}

/// Article and group persistence
#[allow(async_fn_in_trait)]
pub trait ArticleStore {
    /// Create the group or refresh its bounds; the cursor of an existing group is kept
    async fn upsert_group(&self, name: &str, first: u64, last: u64) -> Result<RecordId>;

    async fn resolve_group_id(&self, name: &str) -> Result<Option<RecordId>>;

    /// Ids of the known groups among `names`; unknown names are skipped
    async fn resolve_group_ids(&self, names: &[String]) -> Result<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            if let Some(id) = self.resolve_group_id(name).await? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Whether article `number` of `group` has already been archived
    async fn has_article(&self, group: &str, number: u64) -> Result<bool>;

    async fn resolve_article_id(&self, message_id: &str) -> Result<Option<RecordId>>;

    /// Ids of the archived articles among `message_ids`; unknown ones are skipped
    async fn resolve_article_ids(&self, message_ids: &[String]) -> Result<Vec<RecordId>>;

    async fn create_article(&self, record: ArticleRecord) -> Result<RecordId>;

    /// Record that `article` is number `number` in `group`
    async fn link_article_to_group_number(
        &self,
        article: &RecordId,
        group: &str,
        number: u64,
    ) -> Result<()>;

    /// Last processed article number of `group`, 0 when nothing was processed yet
    async fn group_cursor(&self, group: &str) -> Result<u64>;

    async fn set_group_cursor(&self, group: &str, number: u64) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    groups: HashMap<String, GroupRecord>,
    articles: Vec<(RecordId, ArticleRecord)>,
    by_message_id: HashMap<String, RecordId>,
    numbers: HashMap<(String, u64), RecordId>,
    next_id: u64,
}

impl MemoryState {
    fn allocate(&mut self, prefix: &str) -> RecordId {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }
}

/// In-process [`ArticleStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored articles, in creation order
    pub async fn articles(&self) -> Vec<(RecordId, ArticleRecord)> {
        self.state.lock().await.articles.clone()
    }

    pub async fn group(&self, name: &str) -> Option<GroupRecord> {
        self.state.lock().await.groups.get(name).cloned()
    }

    /// Article linked to `number` in `group`
    pub async fn article_at(&self, group: &str, number: u64) -> Option<RecordId> {
        self.state
            .lock()
            .await
            .numbers
            .get(&(group.to_string(), number))
            .cloned()
    }
}

impl ArticleStore for MemoryStore {
    async fn upsert_group(&self, name: &str, first: u64, last: u64) -> Result<RecordId> {
        let mut state = self.state.lock().await;
        if let Some(group) = state.groups.get_mut(name) {
            group.first = first;
            group.last = last;
            return Ok(group.id.clone());
        }

        let id = state.allocate("g");
        state.groups.insert(
            name.to_string(),
            GroupRecord {
                id: id.clone(),
                name: name.to_string(),
                first,
                last,
                cursor: 0,
            },
        );
        Ok(id)
    }

    async fn resolve_group_id(&self, name: &str) -> Result<Option<RecordId>> {
        Ok(self
            .state
            .lock()
            .await
            .groups
            .get(name)
            .map(|g| g.id.clone()))
    }

    async fn has_article(&self, group: &str, number: u64) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .numbers
            .contains_key(&(group.to_string(), number)))
    }

    async fn resolve_article_id(&self, message_id: &str) -> Result<Option<RecordId>> {
        Ok(self
            .state
            .lock()
            .await
            .by_message_id
            .get(message_id)
            .cloned())
    }

    async fn resolve_article_ids(&self, message_ids: &[String]) -> Result<Vec<RecordId>> {
        let state = self.state.lock().await;
        Ok(message_ids
            .iter()
            .filter_map(|id| state.by_message_id.get(id).cloned())
            .collect())
    }

    async fn create_article(&self, record: ArticleRecord) -> Result<RecordId> {
        let mut state = self.state.lock().await;
        let id = state.allocate("a");
        if let Some(message_id) = &record.article_id {
            state.by_message_id.insert(message_id.clone(), id.clone());
        }
        state.articles.push((id.clone(), record));
        Ok(id)
    }

    async fn link_article_to_group_number(
        &self,
        article: &RecordId,
        group: &str,
        number: u64,
    ) -> Result<()> {
        self.state
            .lock()
            .await
            .numbers
            .insert((group.to_string(), number), article.clone());
        Ok(())
    }

    async fn group_cursor(&self, group: &str) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .groups
            .get(group)
            .map(|g| g.cursor)
            .unwrap_or(0))
    }

    async fn set_group_cursor(&self, group: &str, number: u64) -> Result<()> {
        if let Some(g) = self.state.lock().await.groups.get_mut(group) {
            g.cursor = number;
        }
        Ok(())
    }
}

impl<S: ArticleStore> ArticleStore for &S {
    async fn upsert_group(&self, name: &str, first: u64, last: u64) -> Result<RecordId> {
        (**self).upsert_group(name, first, last).await
    }

    async fn resolve_group_id(&self, name: &str) -> Result<Option<RecordId>> {
        (**self).resolve_group_id(name).await
    }

    async fn resolve_group_ids(&self, names: &[String]) -> Result<Vec<RecordId>> {
        (**self).resolve_group_ids(names).await
    }

    async fn has_article(&self, group: &str, number: u64) -> Result<bool> {
        (**self).has_article(group, number).await
    }

    async fn resolve_article_id(&self, message_id: &str) -> Result<Option<RecordId>> {
        (**self).resolve_article_id(message_id).await
    }

    async fn resolve_article_ids(&self, message_ids: &[String]) -> Result<Vec<RecordId>> {
        (**self).resolve_article_ids(message_ids).await
    }

    async fn create_article(&self, record: ArticleRecord) -> Result<RecordId> {
        (**self).create_article(record).await
    }

    async fn link_article_to_group_number(
        &self,
        article: &RecordId,
        group: &str,
        number: u64,
    ) -> Result<()> {
        (**self).link_article_to_group_number(article, group, number).await
    }

    async fn group_cursor(&self, group: &str) -> Result<u64> {
        (**self).group_cursor(group).await
    }

    async fn set_group_cursor(&self, group: &str, number: u64) -> Result<()> {
        (**self).set_group_cursor(group, number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_cursor() {
        let store = MemoryStore::new();
        let id = store.upsert_group("a.b", 1, 10).await.unwrap();
        store.set_group_cursor("a.b", 7).await.unwrap();

        let again = store.upsert_group("a.b", 2, 20).await.unwrap();
        assert_eq!(id, again);

        let group = store.group("a.b").await.unwrap();
        assert_eq!((group.first, group.last, group.cursor), (2, 20, 7));
        assert_eq!(store.group_cursor("unknown").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_ids_skip_unknown() {
        let store = MemoryStore::new();
        let g = store.upsert_group("a.b", 1, 1).await.unwrap();
        let ids = store
            .resolve_group_ids(&["a.b".to_string(), "x.y".to_string()])
            .await
            .unwrap();
        assert_eq!(ids, vec![g]);
        assert!(
            store
                .resolve_article_ids(&["<nope@x>".to_string()])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
