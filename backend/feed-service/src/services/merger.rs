//! Feed merger
//!
//! Runs every subquery concurrently and merges the results into one page:
//! ordered items are stable-sorted by sort key and cut strictly past the
//! cutoff, then fixed-position items are spliced in at `slot - offset`.
//! The next cutoff is the sort key of the last ordered item kept.

use crate::error::{FeedError, Result};
use crate::models::{FeedEntry, FeedPage, SortKey};
use crate::services::subqueries::{slot_index, FeedSubquery};
use futures::future::try_join_all;
use ranking_service::storage::SortDirection;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    pub limit: usize,
    pub cutoff: Option<SortKey>,
    pub offset: usize,
    pub direction: SortDirection,
}

impl MergeParams {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            cutoff: None,
            offset: 0,
            direction: SortDirection::Desc,
        }
    }

    pub fn cutoff(mut self, cutoff: Option<SortKey>) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }
}

pub async fn merge_feed_queries(
    params: &MergeParams,
    subqueries: &[Box<dyn FeedSubquery>],
) -> Result<FeedPage> {
    let fetched = try_join_all(
        subqueries
            .iter()
            .map(|subquery| subquery.do_query(params.limit, params.cutoff)),
    )
    .await?;

    let mut ordered: Vec<FeedEntry> = Vec::new();
    let mut fixed: Vec<(usize, FeedEntry)> = Vec::new();
    // (sort key kind, subquery that set it)
    let mut key_kind: Option<(&'static str, &'static str)> = None;

    for (subquery, items) in subqueries.iter().zip(fetched) {
        let item_type = subquery.item_type();
        debug!(item_type, count = items.len(), "Subquery results");

        for payload in items {
            let sort_key = subquery.sort_key(&payload)?;
            let entry = FeedEntry {
                item_type,
                sort_key,
                fixed_position: subquery.is_fixed_position(),
                payload,
            };

            if entry.fixed_position {
                fixed.push((slot_index(item_type, &sort_key)?, entry));
                continue;
            }

            if let SortKey::Number(key) = sort_key {
                if !key.is_finite() {
                    return Err(FeedError::NonFiniteSortKey {
                        item_type: item_type.to_string(),
                        item_id: entry.payload.id().to_string(),
                        key,
                    });
                }
            }

            match key_kind {
                None => key_kind = Some((sort_key.kind(), item_type)),
                Some((kind, _)) if kind != sort_key.kind() => {
                    return Err(FeedError::MixedSortKeys {
                        item_type: item_type.to_string(),
                        expected: kind,
                        found: sort_key.kind(),
                    });
                }
                Some(_) => {}
            }
            ordered.push(entry);
        }
    }

    if let (Some(cutoff), Some((kind, _))) = (params.cutoff, key_kind) {
        if cutoff.kind() != kind {
            return Err(FeedError::CutoffTypeMismatch {
                expected: kind,
                found: cutoff.kind(),
            });
        }
    }

    let direction = params.direction;
    ordered.sort_by(|a, b| {
        direction.apply(a.sort_key.cmp_same_kind(&b.sort_key).unwrap_or(Ordering::Equal))
    });

    if let Some(cutoff) = params.cutoff {
        ordered.retain(|entry| entry.sort_key.is_beyond(&cutoff, direction));
    }

    let mut results = ordered;
    fixed.sort_by_key(|(slot, _)| *slot);

    let mut deferred = 0;
    for (slot, entry) in fixed {
        match slot.checked_sub(params.offset) {
            Some(position) => {
                let position = position.min(results.len());
                results.insert(position, entry);
            }
            None => deferred += 1,
        }
    }

    results.truncate(params.limit);

    let cutoff = results
        .iter()
        .rev()
        .find(|entry| !entry.fixed_position)
        .map(|entry| entry.sort_key);
    let end_offset = params.offset + results.len();

    debug!(
        returned = results.len(),
        deferred_fixed = deferred,
        cutoff = ?cutoff,
        end_offset,
        "Merged feed page"
    );

    Ok(FeedPage {
        results,
        cutoff,
        end_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedPayload;
    use crate::services::subqueries::MockFeedSubquery;
    use chrono::{TimeZone, Utc};
    use ranking_service::models::Post;

    fn post(id: &str, score: f64) -> FeedPayload {
        FeedPayload::Post(Post::new(id, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), score))
    }

    /// Ordered source keyed by base score; applies the cutoff like a store would.
    fn scored_source(item_type: &'static str, scores: &[(&str, f64)]) -> Box<dyn FeedSubquery> {
        let items: Vec<FeedPayload> = scores.iter().map(|(id, s)| post(id, *s)).collect();
        let mut mock = MockFeedSubquery::new();
        mock.expect_item_type().return_const(item_type);
        mock.expect_is_fixed_position().return_const(false);
        mock.expect_sort_key()
            .returning(|item| Ok(SortKey::Number(item.post().base_score)));
        mock.expect_do_query().returning(move |limit, cutoff| {
            Ok(items
                .iter()
                .filter(|i| match cutoff {
                    Some(SortKey::Number(c)) => i.post().base_score < c,
                    _ => true,
                })
                .take(limit)
                .cloned()
                .collect())
        });
        Box::new(mock)
    }

    fn fixed_source(item_type: &'static str, id: &str, slot: f64) -> Box<dyn FeedSubquery> {
        let item = post(id, 0.0);
        let mut mock = MockFeedSubquery::new();
        mock.expect_item_type().return_const(item_type);
        mock.expect_is_fixed_position().return_const(true);
        mock.expect_sort_key()
            .returning(move |_| Ok(SortKey::Number(slot)));
        mock.expect_do_query()
            .returning(move |_, _| Ok(vec![item.clone()]));
        Box::new(mock)
    }

    fn date_source() -> Box<dyn FeedSubquery> {
        let mut mock = MockFeedSubquery::new();
        mock.expect_item_type().return_const("newPost");
        mock.expect_is_fixed_position().return_const(false);
        mock.expect_sort_key()
            .returning(|item| Ok(SortKey::Date(item.post().posted_at)));
        mock.expect_do_query()
            .returning(|_, _| Ok(vec![post("d1", 0.0)]));
        Box::new(mock)
    }

    fn ids(page: &FeedPage) -> Vec<&str> {
        page.results.iter().map(|e| e.payload.id()).collect()
    }

    fn scenario() -> Vec<Box<dyn FeedSubquery>> {
        vec![
            scored_source("a", &[("a10", 10.0), ("a8", 8.0), ("a5", 5.0)]),
            scored_source("b", &[("b9", 9.0), ("b7", 7.0)]),
            fixed_source("spotlight", "x", 1.0),
        ]
    }

    #[tokio::test]
    async fn test_merges_and_splices_fixed_item() {
        let page = merge_feed_queries(&MergeParams::new(4), &scenario())
            .await
            .unwrap();

        // x (slot 1) lands at index slot - offset of the sorted page
        assert_eq!(ids(&page), vec!["a10", "x", "b9", "a8"]);
        assert_eq!(page.cutoff, Some(SortKey::Number(8.0)));
        assert_eq!(page.end_offset, 4);
        assert_eq!(page.results[1].item_type, "spotlight");
    }

    #[tokio::test]
    async fn test_next_page_has_no_duplicates() {
        let subqueries = scenario();
        let first = merge_feed_queries(&MergeParams::new(4), &subqueries)
            .await
            .unwrap();
        let second = merge_feed_queries(
            &MergeParams::new(4)
                .cutoff(first.cutoff)
                .offset(first.end_offset),
            &subqueries,
        )
        .await
        .unwrap();

        assert_eq!(ids(&second), vec!["b7", "a5"]);
        assert_eq!(second.cutoff, Some(SortKey::Number(5.0)));
        assert_eq!(second.end_offset, 6);
        for id in ids(&second) {
            assert!(!ids(&first).contains(&id));
        }
    }

    #[tokio::test]
    async fn test_fixed_slot_stability() {
        let subqueries = vec![
            scored_source("a", &[("a1", 10.0), ("a2", 9.0), ("a3", 8.0), ("a4", 7.0)]),
            fixed_source("spotlight", "x", 5.0),
        ];

        let page = merge_feed_queries(&MergeParams::new(10).offset(3), &subqueries)
            .await
            .unwrap();
        assert_eq!(page.results[2].payload.id(), "x");

        // Slot past the end of a short page lands last.
        let page = merge_feed_queries(&MergeParams::new(10), &subqueries)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["a1", "a2", "a3", "a4", "x"]);
        assert_eq!(page.cutoff, Some(SortKey::Number(7.0)));

        // Slot before the page offset is dropped.
        let page = merge_feed_queries(&MergeParams::new(10).offset(6), &subqueries)
            .await
            .unwrap();
        assert!(!ids(&page).contains(&"x"));
    }

    #[tokio::test]
    async fn test_ascending_with_equal_keys_keeps_subquery_order() {
        let subqueries = vec![
            scored_source("a", &[("a1", 1.0), ("a3", 3.0)]),
            scored_source("b", &[("b1", 1.0), ("b2", 2.0)]),
        ];
        let page = merge_feed_queries(
            &MergeParams::new(10).direction(SortDirection::Asc),
            &subqueries,
        )
        .await
        .unwrap();
        assert_eq!(ids(&page), vec!["a1", "b1", "b2", "a3"]);
    }

    #[tokio::test]
    async fn test_only_fixed_items_has_no_cutoff() {
        let subqueries = vec![fixed_source("spotlight", "x", 0.0)];
        let page = merge_feed_queries(&MergeParams::new(5), &subqueries)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["x"]);
        assert_eq!(page.cutoff, None);
        assert_eq!(page.end_offset, 1);
    }

    #[tokio::test]
    async fn test_mixed_sort_keys_rejected() {
        let subqueries = vec![scored_source("a", &[("a1", 1.0)]), date_source()];
        let result = merge_feed_queries(&MergeParams::new(5), &subqueries).await;
        assert!(matches!(result, Err(FeedError::MixedSortKeys { .. })));
    }

    #[tokio::test]
    async fn test_cutoff_type_mismatch_rejected() {
        let subqueries = vec![date_source()];
        let params = MergeParams::new(5).cutoff(Some(SortKey::Number(3.0)));
        let result = merge_feed_queries(&params, &subqueries).await;
        assert!(matches!(result, Err(FeedError::CutoffTypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_non_finite_sort_key_rejected() {
        let subqueries = vec![
            scored_source("a", &[("a3", 3.0), ("n", f64::NAN), ("a1", 1.0)]),
            fixed_source("spotlight", "x", 0.0),
        ];
        let result = merge_feed_queries(&MergeParams::new(5), &subqueries).await;
        match result {
            Err(FeedError::NonFiniteSortKey { item_id, .. }) => assert_eq!(item_id, "n"),
            other => panic!("expected NonFiniteSortKey, got {:?}", other.map(|p| p.results.len())),
        }
    }

    #[tokio::test]
    async fn test_invalid_slot_rejected() {
        let subqueries = vec![fixed_source("spotlight", "x", 1.5)];
        let result = merge_feed_queries(&MergeParams::new(5), &subqueries).await;
        assert!(matches!(result, Err(FeedError::InvalidSlot { .. })));
    }

    #[tokio::test]
    async fn test_subquery_failure_fails_page() {
        let mut failing = MockFeedSubquery::new();
        failing.expect_item_type().return_const("newPost");
        failing.expect_is_fixed_position().return_const(false);
        failing.expect_do_query().returning(|_, _| {
            Err(FeedError::subquery_failed("newPost", anyhow::anyhow!("store unavailable")))
        });

        let subqueries: Vec<Box<dyn FeedSubquery>> =
            vec![scored_source("a", &[("a1", 1.0)]), Box::new(failing)];
        let result = merge_feed_queries(&MergeParams::new(5), &subqueries).await;
        assert!(matches!(result, Err(FeedError::SubqueryFailed { .. })));
    }
}
