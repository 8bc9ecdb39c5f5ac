use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ContentItem, Difficulty};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog query failed: {0}")]
    Query(String),
}

/// Read-only lookup into the platform's approved learning content.
///
/// Implementations must only surface approved, active items. A lookup
/// failure is fatal to the engine call that issued it; the engine never
/// substitutes a partial or cached result. Timeouts and retries are the
/// host's responsibility.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Items for a topic (case-insensitive match), optionally filtered by
    /// difficulty, in ascending difficulty order, at most `limit`.
    async fn by_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError>;

    /// Items of a given difficulty across all topics, at most `limit`.
    async fn by_difficulty(
        &self,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError>;

    /// Items whose topic or tags match `needle` (case-insensitive), at most
    /// `limit`.
    async fn by_topic_or_tag(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError>;
}

/// Catalog backed by an in-memory item list. Reference implementation of the
/// trait contract, also used throughout the test suites.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<ContentItem>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ContentCatalog for InMemoryCatalog {
    async fn by_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError> {
        let mut matched: Vec<ContentItem> = self
            .items
            .iter()
            .filter(|item| item.topic.eq_ignore_ascii_case(topic))
            .filter(|item| difficulty.map_or(true, |d| item.difficulty == d))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.difficulty.cmp(&b.difficulty).then_with(|| a.title.cmp(&b.title)));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn by_difficulty(
        &self,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError> {
        let mut matched: Vec<ContentItem> = self
            .items
            .iter()
            .filter(|item| item.difficulty == difficulty)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.title.cmp(&b.title));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn by_topic_or_tag(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError> {
        let matched: Vec<ContentItem> = self
            .items
            .iter()
            .filter(|item| {
                item.topic.eq_ignore_ascii_case(needle)
                    || item.tags.iter().any(|tag| tag.eq_ignore_ascii_case(needle))
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(matched)
    }
}
