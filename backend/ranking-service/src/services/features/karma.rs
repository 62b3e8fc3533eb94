use super::ScoringFeature;
use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, ItemId, Post, ScoringContext};
use crate::storage::VoteStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct KarmaOptions {
    pub scale: f64,
    pub offset: f64,
}

impl Default for KarmaOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// Aggregate vote score.
///
/// Live requests read `baseScore`. A simulated context rebuilds the score
/// from votes cast strictly before `now`.
pub struct KarmaFeature {
    options: KarmaOptions,
    votes: Arc<dyn VoteStore>,
}

impl KarmaFeature {
    pub fn new(options: KarmaOptions, votes: Arc<dyn VoteStore>) -> Self {
        Self { options, votes }
    }

    async fn karma_as_of(&self, candidates: &[Post], context: &ScoringContext) -> Result<Vec<f64>> {
        let ids: Vec<ItemId> = candidates.iter().map(|p| p.id.clone()).collect();
        let votes = self
            .votes
            .votes_for(&ids)
            .await
            .map_err(|e| RankingError::data_fetch("votes", e))?;

        let mut totals: HashMap<&str, f64> = HashMap::new();
        for vote in &votes {
            if vote.cancelled || vote.voted_at >= context.now() {
                continue;
            }
            *totals.entry(vote.document_id.as_str()).or_insert(0.0) += vote.power;
        }

        debug!(
            candidates = candidates.len(),
            votes = votes.len(),
            "Rebuilt karma from vote history"
        );

        Ok(candidates
            .iter()
            .map(|p| totals.get(p.id.as_str()).copied().unwrap_or(0.0))
            .collect())
    }
}

#[async_trait]
impl ScoringFeature for KarmaFeature {
    fn name(&self) -> &str {
        "karma"
    }

    fn mode(&self) -> FeatureMode {
        FeatureMode::Additive
    }

    async fn score_batch(&self, candidates: &[Post], context: &ScoringContext) -> Result<Vec<f64>> {
        let karma = if context.is_simulated() {
            self.karma_as_of(candidates, context).await?
        } else {
            candidates.iter().map(|p| p.base_score).collect()
        };

        Ok(karma
            .into_iter()
            .map(|k| self.options.scale * k + self.options.offset)
            .collect())
    }
}
