use ranking_service::services::RecommendationService;
use ranking_service::storage::{AccessFilter, ContentStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::models::{FeedPage, FeedRequest};
use crate::services::merger::{merge_feed_queries, MergeParams};
use crate::services::subqueries::{
    FeedSubquery, FixedSlotSubquery, RecommendationsSubquery, SortedPostsSubquery,
};

/// Serves merged feed pages.
pub struct FeedHandler {
    store: Arc<dyn ContentStore>,
    access_filter: Arc<dyn AccessFilter>,
    recommendations: Arc<RecommendationService>,
    config: FeedConfig,
}

impl FeedHandler {
    pub fn new(
        store: Arc<dyn ContentStore>,
        access_filter: Arc<dyn AccessFilter>,
        recommendations: Arc<RecommendationService>,
        config: FeedConfig,
    ) -> Self {
        Self {
            store,
            access_filter,
            recommendations,
            config,
        }
    }

    fn merge_params(&self, request: &FeedRequest) -> Result<MergeParams> {
        let limit = request
            .limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1));

        let offset = match request.offset {
            None => 0,
            Some(offset) if offset >= 0 => offset as usize,
            Some(offset) => {
                return Err(FeedError::BadRequest(format!(
                    "offset must be non-negative, got {}",
                    offset
                )))
            }
        };

        Ok(MergeParams::new(limit)
            .cutoff(request.cutoff)
            .offset(offset)
            .direction(request.sort_direction.unwrap_or(self.config.sort_direction)))
    }

    /// Merge `subqueries` into one page and drop what `viewer` may not see.
    ///
    /// `cutoff` and `endOffset` describe the merged page before access
    /// filtering, so the next request continues after the removed items.
    pub async fn get_feed(
        &self,
        viewer: Option<&str>,
        request: &FeedRequest,
        subqueries: &[Box<dyn FeedSubquery>],
    ) -> Result<FeedPage> {
        let request_id = Uuid::new_v4();
        let params = self.merge_params(request)?;

        debug!(
            %request_id,
            limit = params.limit,
            offset = params.offset,
            cutoff = ?params.cutoff,
            subqueries = subqueries.len(),
            "Merging feed"
        );

        let mut page = merge_feed_queries(&params, subqueries).await?;

        let merged = page.results.len();
        let posts = page.results.iter().map(|e| e.payload.post().clone()).collect();
        let visible: HashSet<String> = self
            .access_filter
            .filter(viewer, posts)
            .await
            .map_err(|e| FeedError::AccessFilterFailed(format!("{:#}", e)))?
            .into_iter()
            .map(|p| p.id)
            .collect();
        page.results.retain(|e| visible.contains(e.payload.id()));

        if page.results.len() < merged {
            warn!(
                %request_id,
                requested = merged,
                returned = page.results.len(),
                "Feed items removed by access filter; page is short"
            );
        }

        info!(
            %request_id,
            returned = page.results.len(),
            end_offset = page.end_offset,
            "Feed page served"
        );

        Ok(page)
    }

    /// Default sources: recently commented posts, plus the optional
    /// spotlight and recommendation slots the request asks for.
    pub fn home_feed_subqueries(
        &self,
        viewer: Option<&str>,
        request: &FeedRequest,
    ) -> Vec<Box<dyn FeedSubquery>> {
        let direction = request.sort_direction.unwrap_or(self.config.sort_direction);

        let mut subqueries: Vec<Box<dyn FeedSubquery>> = vec![Box::new(
            SortedPostsSubquery::recently_commented(self.store.clone(), direction),
        )];

        if let Some(spotlight) = &request.spotlight {
            subqueries.push(Box::new(FixedSlotSubquery::spotlight(
                spotlight.item_id.clone(),
                spotlight.slot.unwrap_or(self.config.spotlight_slot),
                self.store.clone(),
            )));
        }

        if let Some(recommendations) = &request.recommendations {
            let slots = request
                .recommendation_slots
                .clone()
                .unwrap_or_else(|| self.config.recommendation_slots.clone());
            subqueries.push(Box::new(RecommendationsSubquery::new(
                self.recommendations.clone(),
                recommendations.clone(),
                slots,
                viewer.map(str::to_string),
            )));
        }

        subqueries
    }

    pub async fn get_home_feed(&self, viewer: Option<&str>, request: &FeedRequest) -> Result<FeedPage> {
        let subqueries = self.home_feed_subqueries(viewer, request);
        self.get_feed(viewer, request, &subqueries).await
    }
}
