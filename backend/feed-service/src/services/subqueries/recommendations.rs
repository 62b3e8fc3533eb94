use super::{slot_key, FeedSubquery};
use crate::error::{FeedError, Result};
use crate::models::{FeedPayload, RecommendedPost, SortKey};
use async_trait::async_trait;
use ranking_service::services::{RecommendationRequest, RecommendationService};
use std::sync::Arc;

/// Model-based recommendations placed at fixed slots, best first.
pub struct RecommendationsSubquery {
    service: Arc<RecommendationService>,
    request: RecommendationRequest,
    slots: Vec<usize>,
    viewer: Option<String>,
}

impl RecommendationsSubquery {
    pub fn new(
        service: Arc<RecommendationService>,
        request: RecommendationRequest,
        slots: Vec<usize>,
        viewer: Option<String>,
    ) -> Self {
        Self {
            service,
            request,
            slots,
            viewer,
        }
    }
}

#[async_trait]
impl FeedSubquery for RecommendationsSubquery {
    fn item_type(&self) -> &'static str {
        "recommendation"
    }

    fn is_fixed_position(&self) -> bool {
        true
    }

    fn sort_key(&self, item: &FeedPayload) -> Result<SortKey> {
        match item {
            FeedPayload::Recommendation(rec) => self
                .slots
                .get(rec.rank)
                .map(|slot| slot_key(*slot))
                .ok_or_else(|| FeedError::MissingSortKey {
                    item_type: self.item_type().to_string(),
                    item_id: item.id().to_string(),
                }),
            FeedPayload::Post(_) => Err(FeedError::MissingSortKey {
                item_type: self.item_type().to_string(),
                item_id: item.id().to_string(),
            }),
        }
    }

    async fn do_query(&self, limit: usize, _cutoff: Option<SortKey>) -> Result<Vec<FeedPayload>> {
        let count = self.request.limit.min(self.slots.len()).min(limit);
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut request = self.request.clone();
        request.limit = count;

        let recommended = self
            .service
            .recommend_hydrated(&request, self.viewer.as_deref())
            .await?;

        Ok(recommended
            .into_iter()
            .enumerate()
            .map(|(rank, (item, post))| {
                FeedPayload::Recommendation(RecommendedPost {
                    post,
                    score: item.score,
                    features_rubric: item.features_rubric,
                    rank,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ranking_service::config::RecommendationConfig;
    use ranking_service::models::Post;
    use ranking_service::services::{FeatureRegistry, FeatureRequest};
    use ranking_service::storage::{Dataset, MemoryStore};

    fn build(slots: Vec<usize>, limit: usize) -> RecommendationsSubquery {
        let posts = (0..5)
            .map(|i| Post::new(format!("p{}", i), Utc::now(), (i * 10) as f64))
            .collect();
        let store = Arc::new(MemoryStore::new(Dataset {
            posts,
            ..Default::default()
        }));
        let registry = FeatureRegistry::new(store.clone(), store.clone(), store.clone());
        let service = Arc::new(RecommendationService::new(
            store.clone(),
            store,
            registry,
            RecommendationConfig::default(),
        ));
        RecommendationsSubquery::new(
            service,
            RecommendationRequest::new(vec![FeatureRequest::new("karma")], limit),
            slots,
            None,
        )
    }

    #[tokio::test]
    async fn test_ranks_map_to_slots() {
        let subquery = build(vec![1, 4], 10);
        let items = subquery.do_query(20, None).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id(), "p4");
        assert_eq!(subquery.sort_key(&items[0]).unwrap(), SortKey::Number(1.0));
        assert_eq!(subquery.sort_key(&items[1]).unwrap(), SortKey::Number(4.0));
    }

    #[tokio::test]
    async fn test_respects_limits() {
        let subquery = build(vec![0, 1, 2], 10);
        assert_eq!(subquery.do_query(1, None).await.unwrap().len(), 1);

        let subquery = build(vec![0, 1, 2], 0);
        assert!(subquery.do_query(5, None).await.unwrap().is_empty());
    }
}
