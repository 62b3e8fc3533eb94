// ============================================
// Scoring Features
// ============================================
//
// A scoring feature maps a batch of candidates to one number per
// candidate. Features are either summed into the base score (additive)
// or applied as multipliers on top of it (multiplicative).
//
// Names arriving from configuration resolve through the closed
// `FeatureName` enum; the registry builds a feature from validated
// options with its collaborators injected.

pub mod karma;
pub mod recent_comments;
pub mod similarity;
pub mod time_decay;

pub use karma::{KarmaFeature, KarmaOptions};
pub use recent_comments::{RecentCommentsFeature, RecentCommentsOptions};
pub use similarity::{SimilarityFeature, SimilarityOptions, SimilarityTarget};
pub use time_decay::{TimeDecayFeature, TimeDecayOptions};

use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, Post, ScoringContext};
use crate::storage::{CommentStore, EmbeddingStore, VoteStore};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait ScoringFeature: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> FeatureMode;

    /// One score per candidate, in candidate order.
    async fn score_batch(&self, candidates: &[Post], context: &ScoringContext) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureName {
    Karma,
    TimeDecay,
    Similarity,
    RecentComments,
}

impl FeatureName {
    pub const ALL: [FeatureName; 4] = [
        FeatureName::Karma,
        FeatureName::TimeDecay,
        FeatureName::Similarity,
        FeatureName::RecentComments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Karma => "karma",
            FeatureName::TimeDecay => "timeDecay",
            FeatureName::Similarity => "similarity",
            FeatureName::RecentComments => "recentComments",
        }
    }

    pub fn mode(&self) -> FeatureMode {
        match self {
            FeatureName::TimeDecay => FeatureMode::Multiplicative,
            FeatureName::Karma | FeatureName::Similarity | FeatureName::RecentComments => {
                FeatureMode::Additive
            }
        }
    }

    pub fn default_options(&self) -> serde_json::Value {
        let value = match self {
            FeatureName::Karma => serde_json::to_value(KarmaOptions::default()),
            FeatureName::TimeDecay => serde_json::to_value(TimeDecayOptions::default()),
            FeatureName::Similarity => serde_json::to_value(SimilarityOptions::default()),
            FeatureName::RecentComments => serde_json::to_value(RecentCommentsOptions::default()),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self> {
        FeatureName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| RankingError::UnknownFeature(s.to_string()))
    }
}

/// A feature as requested by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl FeatureRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// A resolved feature request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDescriptor {
    pub name: FeatureName,
    pub mode: FeatureMode,
    pub options: Option<serde_json::Value>,
}

impl FeatureDescriptor {
    pub fn resolve(request: &FeatureRequest) -> Result<Self> {
        let name: FeatureName = request.name.parse()?;
        Ok(Self {
            name,
            mode: name.mode(),
            options: request.options.clone(),
        })
    }

    pub fn default_options(&self) -> serde_json::Value {
        self.name.default_options()
    }

    fn parse_options<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match &self.options {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                RankingError::InvalidFeatureOptions {
                    feature: self.name.to_string(),
                    message: e.to_string(),
                }
            }),
        }
    }
}

/// Builds features from descriptors.
#[derive(Clone)]
pub struct FeatureRegistry {
    votes: Arc<dyn VoteStore>,
    comments: Arc<dyn CommentStore>,
    embeddings: Arc<dyn EmbeddingStore>,
}

impl FeatureRegistry {
    pub fn new(
        votes: Arc<dyn VoteStore>,
        comments: Arc<dyn CommentStore>,
        embeddings: Arc<dyn EmbeddingStore>,
    ) -> Self {
        Self {
            votes,
            comments,
            embeddings,
        }
    }

    pub fn build(&self, descriptor: &FeatureDescriptor) -> Result<Box<dyn ScoringFeature>> {
        let feature: Box<dyn ScoringFeature> = match descriptor.name {
            FeatureName::Karma => Box::new(KarmaFeature::new(
                descriptor.parse_options()?,
                self.votes.clone(),
            )),
            FeatureName::TimeDecay => Box::new(TimeDecayFeature::new(descriptor.parse_options()?)?),
            FeatureName::Similarity => Box::new(SimilarityFeature::new(
                descriptor.parse_options()?,
                self.embeddings.clone(),
            )),
            FeatureName::RecentComments => Box::new(RecentCommentsFeature::new(
                descriptor.parse_options()?,
                self.comments.clone(),
            )?),
        };
        Ok(feature)
    }

    /// Resolve and build every requested feature, failing on the first bad one.
    pub fn build_all(&self, requests: &[FeatureRequest]) -> Result<Vec<Box<dyn ScoringFeature>>> {
        requests
            .iter()
            .map(|request| self.build(&FeatureDescriptor::resolve(request)?))
            .collect()
    }
}
