use super::{slot_key, FeedSubquery};
use crate::error::{FeedError, Result};
use crate::models::{FeedPayload, SortKey};
use async_trait::async_trait;
use ranking_service::storage::{ContentStore, FindOptions, Selector};
use std::sync::Arc;

/// One promoted post pinned to a slot.
pub struct FixedSlotSubquery {
    item_type: &'static str,
    item_id: String,
    slot: usize,
    store: Arc<dyn ContentStore>,
}

impl FixedSlotSubquery {
    pub fn new(
        item_type: &'static str,
        item_id: impl Into<String>,
        slot: usize,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            item_type,
            item_id: item_id.into(),
            slot,
            store,
        }
    }

    pub fn spotlight(item_id: impl Into<String>, slot: usize, store: Arc<dyn ContentStore>) -> Self {
        Self::new("spotlight", item_id, slot, store)
    }
}

#[async_trait]
impl FeedSubquery for FixedSlotSubquery {
    fn item_type(&self) -> &'static str {
        self.item_type
    }

    fn is_fixed_position(&self) -> bool {
        true
    }

    fn sort_key(&self, _item: &FeedPayload) -> Result<SortKey> {
        Ok(slot_key(self.slot))
    }

    /// The cutoff does not apply; the merger places or drops the item by slot.
    async fn do_query(&self, limit: usize, _cutoff: Option<SortKey>) -> Result<Vec<FeedPayload>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .find(
                &Selector::Ids(vec![self.item_id.clone()]).and(Selector::Published),
                &FindOptions::new().limit(1),
            )
            .await
            .map_err(|e| FeedError::subquery_failed(self.item_type, e))?;

        Ok(rows.into_iter().map(FeedPayload::Post).collect())
    }
}
