// ============================================
// Feed Subqueries
// ============================================
//
// Each subquery is one independent source of feed items with its own
// criterion. Ordered subqueries return items sorted by a date or number
// key and honour the cutoff; fixed-position subqueries return items that
// go to a given slot of the merged feed, keyed by slot index.

mod fixed_slot;
mod recommendations;
mod sorted_posts;

pub use fixed_slot::FixedSlotSubquery;
pub use recommendations::RecommendationsSubquery;
pub use sorted_posts::SortedPostsSubquery;

use crate::error::{FeedError, Result};
use crate::models::{FeedPayload, SortKey};
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSubquery: Send + Sync {
    /// Tag for items from this source, e.g. `newPost`.
    fn item_type(&self) -> &'static str;

    fn is_fixed_position(&self) -> bool;

    fn sort_key(&self, item: &FeedPayload) -> Result<SortKey>;

    /// At most `limit` items strictly past `cutoff`.
    async fn do_query(&self, limit: usize, cutoff: Option<SortKey>) -> Result<Vec<FeedPayload>>;
}

/// Slot index as a sort key.
pub(crate) fn slot_key(slot: usize) -> SortKey {
    SortKey::Number(slot as f64)
}

/// Finite non-negative integer slot carried by a fixed-position key.
pub fn slot_index(item_type: &str, key: &SortKey) -> Result<usize> {
    match key {
        SortKey::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(FeedError::InvalidSlot {
            item_type: item_type.to_string(),
            slot: match other {
                SortKey::Number(n) => n.to_string(),
                SortKey::Date(d) => d.to_rfc3339(),
            },
        }),
    }
}
