use super::ScoringFeature;
use crate::error::{RankingError, Result};
use crate::models::{FeatureMode, Post, ScoringContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct TimeDecayOptions {
    pub age_offset_hours: f64,
    pub exponent: f64,
}

impl Default for TimeDecayOptions {
    fn default() -> Self {
        Self {
            age_offset_hours: 2.0,
            exponent: 1.15,
        }
    }
}

/// `1 / (ageOffset + ageHours)^exponent`. Items dated after `now` score 1.
pub struct TimeDecayFeature {
    options: TimeDecayOptions,
}

impl TimeDecayFeature {
    pub fn new(options: TimeDecayOptions) -> Result<Self> {
        if !(options.age_offset_hours.is_finite() && options.age_offset_hours > 0.0) {
            return Err(RankingError::InvalidFeatureOptions {
                feature: "timeDecay".into(),
                message: format!(
                    "ageOffsetHours must be a positive number, got {}",
                    options.age_offset_hours
                ),
            });
        }
        if !options.exponent.is_finite() {
            return Err(RankingError::InvalidFeatureOptions {
                feature: "timeDecay".into(),
                message: format!("exponent must be finite, got {}", options.exponent),
            });
        }
        Ok(Self { options })
    }

    fn decay(&self, age_hours: f64) -> f64 {
        if age_hours < 0.0 {
            return 1.0;
        }
        1.0 / (self.options.age_offset_hours + age_hours).powf(self.options.exponent)
    }
}

#[async_trait]
impl ScoringFeature for TimeDecayFeature {
    fn name(&self) -> &str {
        "timeDecay"
    }

    fn mode(&self) -> FeatureMode {
        FeatureMode::Multiplicative
    }

    async fn score_batch(&self, candidates: &[Post], context: &ScoringContext) -> Result<Vec<f64>> {
        let now = context.now();
        Ok(candidates
            .iter()
            .map(|p| {
                let age_hours = (now - p.posted_at).num_milliseconds() as f64 / 3_600_000.0;
                self.decay(age_hours)
            })
            .collect())
    }
}
