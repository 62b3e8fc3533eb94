use super::ScoringFeature;
use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, ItemId, Post, ScoringContext};
use crate::storage::EmbeddingStore;
use crate::utils::{dot_product, norm, normalize, scale, vector_sum};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SimilarityTarget {
    pub item_id: ItemId,
    #[serde(default = "default_target_weight")]
    pub weight: f64,
}

fn default_target_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SimilarityOptions {
    pub targets: Vec<SimilarityTarget>,
}

/// Dot product of each candidate's embedding with the normalized,
/// weighted sum of the target embeddings.
pub struct SimilarityFeature {
    options: SimilarityOptions,
    embeddings: Arc<dyn EmbeddingStore>,
}

impl SimilarityFeature {
    pub fn new(options: SimilarityOptions, embeddings: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            options,
            embeddings,
        }
    }

    async fn fetch(&self, ids: Vec<&str>) -> Result<Vec<Option<Vec<f32>>>> {
        try_join_all(ids.into_iter().map(|id| self.embeddings.get(id)))
            .await
            .map_err(|e| RankingError::data_fetch("embeddings", e))
    }

    /// `None` when no target has an embedding.
    async fn target_vector(&self) -> Result<Option<Vec<f32>>> {
        let fetched = self
            .fetch(self.options.targets.iter().map(|t| t.item_id.as_str()).collect())
            .await?;

        let weighted: Vec<Vec<f32>> = self
            .options
            .targets
            .iter()
            .zip(fetched)
            .filter_map(|(target, embedding)| match embedding {
                Some(v) => Some(scale(&v, target.weight as f32)),
                None => {
                    debug!(item_id = %target.item_id, "Similarity target has no embedding, skipping");
                    None
                }
            })
            .collect();

        if weighted.is_empty() {
            return Ok(None);
        }
        Ok(Some(normalize(&vector_sum(&weighted)?)))
    }
}

#[async_trait]
impl ScoringFeature for SimilarityFeature {
    fn name(&self) -> &str {
        "similarity"
    }

    fn mode(&self) -> FeatureMode {
        FeatureMode::Additive
    }

    async fn score_batch(&self, candidates: &[Post], _context: &ScoringContext) -> Result<Vec<f64>> {
        let target = match self.target_vector().await? {
            Some(v) if norm(&v) > f32::EPSILON => v,
            _ => {
                debug!(
                    targets = self.options.targets.len(),
                    "No usable similarity target, scoring zero"
                );
                return Ok(vec![0.0; candidates.len()]);
            }
        };

        let embeddings = self
            .fetch(candidates.iter().map(|p| p.id.as_str()).collect())
            .await?;

        embeddings
            .into_iter()
            .map(|embedding| match embedding {
                Some(v) => dot_product(&v, &target).map(f64::from),
                None => Ok(0.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockEmbeddingStore;
    use chrono::Utc;
    use std::collections::HashMap;

    fn store(entries: Vec<(&str, Vec<f32>)>) -> Arc<dyn EmbeddingStore> {
        let map: HashMap<String, Vec<f32>> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let mut mock = MockEmbeddingStore::new();
        mock.expect_get()
            .returning(move |id| Ok(map.get(id).cloned()));
        Arc::new(mock)
    }

    fn target(id: &str, weight: f64) -> SimilarityTarget {
        SimilarityTarget {
            item_id: id.into(),
            weight,
        }
    }

    fn posts(ids: &[&str]) -> Vec<Post> {
        ids.iter().map(|id| Post::new(*id, Utc::now(), 0.0)).collect()
    }

    #[tokio::test]
    async fn test_scores_against_combined_target() {
        let embeddings = store(vec![
            ("t1", vec![1.0, 0.0]),
            ("t2", vec![0.0, 1.0]),
            ("same", vec![2.0, 0.0]),
            ("other", vec![0.0, 3.0]),
        ]);
        let feature = SimilarityFeature::new(
            SimilarityOptions {
                targets: vec![target("t1", 1.0), target("t2", 0.0), target("missing", 5.0)],
            },
            embeddings,
        );

        let scores = feature
            .score_batch(&posts(&["same", "other", "none"]), &ScoringContext::current(None))
            .await
            .unwrap();

        assert!((scores[0] - 2.0).abs() < 1e-6);
        assert!(scores[1].abs() < 1e-6);
        assert_eq!(scores[2], 0.0);
    }

    #[tokio::test]
    async fn test_no_targets_scores_zero() {
        let feature = SimilarityFeature::new(SimilarityOptions::default(), store(vec![]));
        let scores = feature
            .score_batch(&posts(&["a", "b"]), &ScoringContext::current(None))
            .await
            .unwrap();
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_zero_norm_target_scores_zero() {
        let embeddings = store(vec![
            ("t1", vec![1.0, 0.0]),
            ("t2", vec![-1.0, 0.0]),
            ("c", vec![5.0, 1.0]),
        ]);
        let feature = SimilarityFeature::new(
            SimilarityOptions {
                targets: vec![target("t1", 1.0), target("t2", 1.0)],
            },
            embeddings,
        );

        let scores = feature
            .score_batch(&posts(&["c"]), &ScoringContext::current(None))
            .await
            .unwrap();
        assert_eq!(scores, vec![0.0]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let embeddings = store(vec![("t", vec![1.0, 0.0]), ("a", vec![1.0, 0.0, 0.0])]);
        let feature = SimilarityFeature::new(
            SimilarityOptions {
                targets: vec![target("t", 1.0)],
            },
            embeddings,
        );
        let result = feature
            .score_batch(&posts(&["a"]), &ScoringContext::current(None))
            .await;
        assert!(matches!(result, Err(RankingError::DimensionMismatch(3, 2))));
    }

    #[test]
    fn test_target_weight_defaults_to_one() {
        let options: SimilarityOptions =
            serde_json::from_value(serde_json::json!({"targets": [{"itemId": "t"}]})).unwrap();
        assert_eq!(options.targets[0].weight, 1.0);
    }
}
