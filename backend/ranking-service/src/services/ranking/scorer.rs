use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, Post, RubricEntry, ScoredItem, ScoringContext};
use crate::services::features::ScoringFeature;
use futures::future::try_join_all;
use tracing::debug;

/// Feature pipeline - scores a batch with every feature concurrently
pub struct FeaturePipeline {
    features: Vec<Box<dyn ScoringFeature>>,
}

impl FeaturePipeline {
    pub fn new(features: Vec<Box<dyn ScoringFeature>>) -> Self {
        Self { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Score `candidates`, preserving their order.
    ///
    /// One failing feature fails the whole batch.
    pub async fn score(
        &self,
        candidates: &[Post],
        context: &ScoringContext,
    ) -> Result<Vec<ScoredItem>> {
        let outputs = try_join_all(
            self.features
                .iter()
                .map(|feature| feature.score_batch(candidates, context)),
        )
        .await?;

        for (feature, scores) in self.features.iter().zip(&outputs) {
            if scores.len() != candidates.len() {
                return Err(RankingError::FeatureOutputMismatch {
                    feature: feature.name().to_string(),
                    expected: candidates.len(),
                    actual: scores.len(),
                });
            }
        }

        let scored: Vec<ScoredItem> = candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let rubric: Vec<RubricEntry> = self
                    .features
                    .iter()
                    .zip(&outputs)
                    .map(|(feature, scores)| RubricEntry {
                        feature: feature.name().to_string(),
                        mode: feature.mode(),
                        value: scores[i],
                    })
                    .collect();

                ScoredItem {
                    item_id: candidate.id.clone(),
                    score: compose(&rubric),
                    features_rubric: rubric,
                }
            })
            .collect();

        debug!(
            candidates = candidates.len(),
            features = self.features.len(),
            "Scored candidate batch"
        );

        Ok(scored)
    }
}

/// `sum(additive) * product(multiplicative)`
pub fn compose(rubric: &[RubricEntry]) -> f64 {
    let (base, multiplier) = rubric
        .iter()
        .fold((0.0, 1.0), |(base, multiplier), entry| match entry.mode {
            FeatureMode::Additive => (base + entry.value, multiplier),
            FeatureMode::Multiplicative => (base, multiplier * entry.value),
        });
    base * multiplier
}
