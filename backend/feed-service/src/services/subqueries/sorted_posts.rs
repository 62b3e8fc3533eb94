use super::FeedSubquery;
use crate::error::{FeedError, Result};
use crate::models::{FeedPayload, SortKey};
use async_trait::async_trait;
use ranking_service::storage::{ContentStore, Field, FindOptions, Selector, SortDirection};
use std::sync::Arc;
use tracing::debug;

/// Published posts sorted by one field.
pub struct SortedPostsSubquery {
    item_type: &'static str,
    field: Field,
    direction: SortDirection,
    selector: Selector,
    store: Arc<dyn ContentStore>,
}

impl SortedPostsSubquery {
    pub fn new(
        item_type: &'static str,
        field: Field,
        direction: SortDirection,
        selector: Selector,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            item_type,
            field,
            direction,
            selector,
            store,
        }
    }

    /// Posts by latest comment.
    pub fn recently_commented(store: Arc<dyn ContentStore>, direction: SortDirection) -> Self {
        Self::new(
            "postCommented",
            Field::LastCommentedAt,
            direction,
            Selector::Published,
            store,
        )
    }

    pub fn newest(store: Arc<dyn ContentStore>, direction: SortDirection) -> Self {
        Self::new("newPost", Field::PostedAt, direction, Selector::Published, store)
    }

    pub fn top_scored(store: Arc<dyn ContentStore>, direction: SortDirection) -> Self {
        Self::new("topPost", Field::BaseScore, direction, Selector::Published, store)
    }
}

#[async_trait]
impl FeedSubquery for SortedPostsSubquery {
    fn item_type(&self) -> &'static str {
        self.item_type
    }

    fn is_fixed_position(&self) -> bool {
        false
    }

    fn sort_key(&self, item: &FeedPayload) -> Result<SortKey> {
        item.post()
            .field_value(self.field)
            .map(SortKey::from)
            .ok_or_else(|| FeedError::MissingSortKey {
                item_type: self.item_type.to_string(),
                item_id: item.id().to_string(),
            })
    }

    async fn do_query(&self, limit: usize, cutoff: Option<SortKey>) -> Result<Vec<FeedPayload>> {
        let mut selector = self.selector.clone().and(Selector::Exists(self.field));
        if let Some(cutoff) = cutoff {
            selector = selector.and(Selector::beyond(self.field, self.direction, cutoff.into()));
        }

        let rows = self
            .store
            .find(
                &selector,
                &FindOptions::new().sort_by(self.field, self.direction).limit(limit),
            )
            .await
            .map_err(|e| FeedError::subquery_failed(self.item_type, e))?;

        debug!(item_type = self.item_type, count = rows.len(), "Subquery returned");
        Ok(rows.into_iter().map(FeedPayload::Post).collect())
    }
}
