// ============================================
// Recommendation Service
// ============================================
//
// Two entry points:
// - `recommend`: feature-pipeline request over a posting-date window
// - `recommend_posts`: the parameterized score/select algorithm
//
// Both select on the score-fields projection, hydrate only the winners
// and pass them through the access filter. Items the filter removes are
// dropped and logged; the result is never backfilled.

pub mod algorithm;

pub use algorithm::RecommendationAlgorithm;

use crate::config::RecommendationConfig;
use crate::error::{RankingError, Result};
use crate::models::{Post, ScoredItem, ScoringContext};
use crate::services::features::{FeatureRegistry, FeatureRequest};
use crate::services::ranking::FeaturePipeline;
use crate::services::selection::{
    select_sample, select_top, CandidateSelector, HydrateOrder, SelectionMethod,
};
use crate::storage::{
    AccessFilter, Comparison, ContentStore, Field, FieldValue, FindOptions, Projection, Selector,
    SortDirection,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `from <= postedAt < to`; an open bound is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateWindow {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl CandidateWindow {
    fn selector(&self) -> Selector {
        let mut selector = Selector::All;
        if let Some(from) = self.from {
            selector = selector.and(Selector::compare(
                Field::PostedAt,
                Comparison::Gte,
                FieldValue::Date(from),
            ));
        }
        if let Some(to) = self.to {
            selector = selector.and(Selector::compare(
                Field::PostedAt,
                Comparison::Lt,
                FieldValue::Date(to),
            ));
        }
        selector
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default)]
    pub features: Vec<FeatureRequest>,
    pub limit: usize,
    #[serde(default)]
    pub candidate_window: CandidateWindow,
    /// `top` or `sample`; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Score as of this time instead of now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl RecommendationRequest {
    pub fn new(features: Vec<FeatureRequest>, limit: usize) -> Self {
        Self {
            features,
            limit,
            candidate_window: CandidateWindow::default(),
            method: None,
            as_of: None,
        }
    }
}

pub struct RecommendationService {
    store: Arc<dyn ContentStore>,
    access_filter: Arc<dyn AccessFilter>,
    registry: FeatureRegistry,
    selector: CandidateSelector,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        access_filter: Arc<dyn AccessFilter>,
        registry: FeatureRegistry,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            selector: CandidateSelector::new(store.clone()),
            store,
            access_filter,
            registry,
            config,
        }
    }

    fn rng(&self) -> StdRng {
        match self.config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn method(&self, requested: Option<&str>) -> Result<SelectionMethod> {
        match requested {
            Some(name) => name.parse(),
            None => Ok(self.config.default_method),
        }
    }

    /// Scored winners with their rubric, best first for `top`.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
        viewer: Option<&str>,
    ) -> Result<Vec<ScoredItem>> {
        Ok(self
            .recommend_hydrated(request, viewer)
            .await?
            .into_iter()
            .map(|(item, _)| item)
            .collect())
    }

    /// Like `recommend`, paired with the hydrated, access-checked post.
    pub async fn recommend_hydrated(
        &self,
        request: &RecommendationRequest,
        viewer: Option<&str>,
    ) -> Result<Vec<(ScoredItem, Post)>> {
        let method = self.method(request.method.as_deref())?;
        let pipeline = FeaturePipeline::new(self.registry.build_all(&request.features)?);

        let viewer_id = viewer.map(str::to_string);
        let context = match request.as_of {
            Some(at) => ScoringContext::as_of(at, viewer_id),
            None => ScoringContext::current(viewer_id),
        };

        if request.limit == 0 {
            return Ok(Vec::new());
        }

        let selector = Selector::Published
            .and(Selector::RecommendationsEnabled)
            .and(request.candidate_window.selector());
        let options = FindOptions::new()
            .sort_by(Field::PostedAt, SortDirection::Desc)
            .limit(self.config.max_candidates)
            .projection(Projection::ScoreFields);

        let candidates = self
            .store
            .find(&selector, &options)
            .await
            .map_err(|e| RankingError::data_fetch("candidates", e))?;

        debug!(
            candidates = candidates.len(),
            features = ?pipeline.feature_names(),
            method = %method,
            "Scoring recommendation candidates"
        );

        let scored = pipeline.score(&candidates, &context).await?;

        let winners = match method {
            SelectionMethod::Top => select_top(scored, Vec::new(), request.limit, |s| s.score),
            SelectionMethod::Sample => select_sample(
                scored,
                Vec::new(),
                request.limit,
                |s| s.score.max(0.0),
                &mut self.rng(),
            )?,
        };

        let ids: Vec<String> = winners.iter().map(|s| s.item_id.clone()).collect();
        let hydrated = self.selector.hydrate(&ids, HydrateOrder::Selection).await?;
        let mut visible: HashMap<String, Post> = self
            .filter_accessible(viewer, hydrated)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let results: Vec<(ScoredItem, Post)> = winners
            .into_iter()
            .filter_map(|item| visible.remove(&item.item_id).map(|post| (item, post)))
            .collect();

        info!(
            requested = request.limit,
            returned = results.len(),
            method = %method,
            "Recommendation request served"
        );

        Ok(results)
    }

    /// Recommend up to `count` posts using a parameterized algorithm.
    pub async fn recommend_posts(
        &self,
        algorithm: &RecommendationAlgorithm,
        count: usize,
        viewer: Option<&str>,
    ) -> Result<Vec<Post>> {
        let method = algorithm.method()?;

        let selector = algorithm.candidate_selector(viewer, self.config.minimum_base_score);
        let pool = self
            .store
            .find(
                &selector,
                &FindOptions::new().projection(Projection::ScoreFields),
            )
            .await
            .map_err(|e| RankingError::data_fetch("recommendable posts", e))?;

        let always: Vec<Post> = if algorithm.exclude_default_recommendations {
            Vec::new()
        } else {
            pool.iter()
                .filter(|p| p.default_recommendation)
                .cloned()
                .collect()
        };

        debug!(
            pool = pool.len(),
            defaults = always.len(),
            method = %method,
            "Selecting recommended posts"
        );

        let selected = match method {
            SelectionMethod::Top => select_top(pool, always, count, |p| algorithm.score(p)),
            SelectionMethod::Sample => {
                select_sample(pool, always, count, |p| algorithm.score(p), &mut self.rng())?
            }
        };

        let ids: Vec<String> = selected.into_iter().map(|p| p.id).collect();
        let hydrated = self
            .selector
            .hydrate(&ids, HydrateOrder::Stored(algorithm.hydrate_sort(method)))
            .await?;

        self.filter_accessible(viewer, hydrated).await
    }

    async fn filter_accessible(&self, viewer: Option<&str>, posts: Vec<Post>) -> Result<Vec<Post>> {
        let before = posts.len();
        let accessible = self
            .access_filter
            .filter(viewer, posts)
            .await
            .map_err(|e| RankingError::data_fetch("access filter", e))?;

        if accessible.len() < before {
            warn!(
                requested = before,
                returned = accessible.len(),
                "Recommendation engine returned a post which permissions filtered out as inaccessible"
            );
        }
        Ok(accessible)
    }
}
