use super::ScoringFeature;
use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, ItemId, Post, ScoringContext};
use crate::storage::CommentStore;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RecentCommentsOptions {
    pub window_hours: f64,
}

impl Default for RecentCommentsOptions {
    fn default() -> Self {
        Self { window_hours: 24.0 }
    }
}

/// 1.0 when the latest comment at or before `now` is inside the window.
pub struct RecentCommentsFeature {
    window: Duration,
    comments: Arc<dyn CommentStore>,
}

impl RecentCommentsFeature {
    pub fn new(options: RecentCommentsOptions, comments: Arc<dyn CommentStore>) -> Result<Self> {
        if !(options.window_hours.is_finite() && options.window_hours >= 0.0) {
            return Err(RankingError::InvalidFeatureOptions {
                feature: "recentComments".into(),
                message: format!(
                    "windowHours must be a non-negative number, got {}",
                    options.window_hours
                ),
            });
        }
        let window = Duration::milliseconds((options.window_hours * 3_600_000.0) as i64);
        Ok(Self { window, comments })
    }
}

#[async_trait]
impl ScoringFeature for RecentCommentsFeature {
    fn name(&self) -> &str {
        "recentComments"
    }

    fn mode(&self) -> FeatureMode {
        FeatureMode::Additive
    }

    async fn score_batch(&self, candidates: &[Post], context: &ScoringContext) -> Result<Vec<f64>> {
        let now = context.now();

        // The live timestamp is only usable when it is not after `now`.
        let stale: Vec<ItemId> = candidates
            .iter()
            .filter(|p| p.last_commented_at.map(|t| t > now).unwrap_or(false))
            .map(|p| p.id.clone())
            .collect();

        let historical: HashMap<ItemId, DateTime<Utc>> = if stale.is_empty() {
            HashMap::new()
        } else {
            // "At or before now" is "strictly before now + 1ms" at storage precision.
            self.comments
                .last_comment_before(&stale, now + Duration::milliseconds(1))
                .await
                .map_err(|e| RankingError::data_fetch("comments", e))?
        };

        Ok(candidates
            .iter()
            .map(|p| {
                let last = match p.last_commented_at {
                    Some(t) if t > now => historical.get(&p.id).copied(),
                    other => other,
                };
                match last {
                    Some(t) if now - t < self.window => 1.0,
                    _ => 0.0,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;
    use crate::storage::{Dataset, MemoryStore};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn post(id: &str, last_comment: Option<DateTime<Utc>>) -> Post {
        let mut p = Post::new(id, now() - Duration::days(10), 0.0);
        p.last_commented_at = last_comment;
        p
    }

    #[tokio::test]
    async fn test_uses_live_timestamp_when_not_in_future() {
        let store = Arc::new(MemoryStore::new(Dataset::default()));
        let feature = RecentCommentsFeature::new(RecentCommentsOptions::default(), store).unwrap();

        let posts = vec![
            post("recent", Some(now() - Duration::hours(3))),
            post("stale", Some(now() - Duration::hours(30))),
            post("never", None),
        ];
        let scores = feature
            .score_batch(&posts, &ScoringContext::at(now(), None))
            .await
            .unwrap();
        assert_eq!(scores, vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_looks_up_history_when_live_timestamp_is_after_now() {
        let dataset = Dataset {
            comments: vec![
                Comment {
                    post_id: "a".into(),
                    posted_at: now() - Duration::hours(2),
                    deleted: false,
                },
                Comment {
                    post_id: "b".into(),
                    posted_at: now() - Duration::hours(48),
                    deleted: false,
                },
            ],
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::new(dataset));
        let feature = RecentCommentsFeature::new(RecentCommentsOptions::default(), store).unwrap();

        let later = Some(now() + Duration::hours(5));
        let posts = vec![post("a", later), post("b", later), post("c", later)];
        let scores = feature
            .score_batch(&posts, &ScoringContext::as_of(now(), None))
            .await
            .unwrap();
        assert_eq!(scores, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_negative_window() {
        let store = Arc::new(MemoryStore::new(Dataset::default()));
        let result = RecentCommentsFeature::new(RecentCommentsOptions { window_hours: -1.0 }, store);
        assert!(result.is_err());
    }
}
