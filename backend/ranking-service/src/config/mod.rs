use crate::services::selection::SelectionMethod;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// Upper bound on candidates fetched per recommendation request
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Used when a request names no selection method
    #[serde(default)]
    pub default_method: SelectionMethod,
    /// Fixed seed for reproducible sampling; entropy when unset
    #[serde(default)]
    pub sample_seed: Option<u64>,
    #[serde(default = "default_minimum_base_score")]
    pub minimum_base_score: f64,
}

fn default_max_candidates() -> usize {
    2000
}

fn default_minimum_base_score() -> f64 {
    50.0
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            default_method: SelectionMethod::default(),
            sample_seed: None,
            minimum_base_score: default_minimum_base_score(),
        }
    }
}

impl Config {
    /// Reads `RANKING_MAX_CANDIDATES`, `RANKING_DEFAULT_METHOD`,
    /// `RANKING_SAMPLE_SEED` and `RANKING_MINIMUM_BASE_SCORE`.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Ok(Config {
            recommendation: envy::prefixed("RANKING_").from_env::<RecommendationConfig>()?,
        })
    }
}
