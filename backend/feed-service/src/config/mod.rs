use ranking_service::storage::SortDirection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub feed: FeedConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// Viewer the replay binary requests feeds as; anonymous when unset.
    #[serde(default)]
    pub viewer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Slots recommendations are placed at, best first
    #[serde(default = "default_recommendation_slots")]
    pub recommendation_slots: Vec<usize>,
    #[serde(default)]
    pub spotlight_slot: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            sort_direction: SortDirection::default(),
            recommendation_slots: default_recommendation_slots(),
            spotlight_slot: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                viewer_id: std::env::var("FEED_VIEWER_ID").ok().filter(|v| !v.is_empty()),
            },
            feed: FeedConfig {
                default_limit: std::env::var("FEED_DEFAULT_LIMIT")
                    .unwrap_or_else(|_| default_limit().to_string())
                    .parse()?,
                max_limit: std::env::var("FEED_MAX_LIMIT")
                    .unwrap_or_else(|_| default_max_limit().to_string())
                    .parse()?,
                sort_direction: std::env::var("FEED_SORT_DIRECTION")
                    .unwrap_or_else(|_| "desc".to_string())
                    .parse()?,
                recommendation_slots: match std::env::var("FEED_RECOMMENDATION_SLOTS") {
                    Ok(raw) => parse_slots(&raw)?,
                    Err(_) => default_recommendation_slots(),
                },
                spotlight_slot: std::env::var("FEED_SPOTLIGHT_SLOT")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()?,
            },
            dataset: DatasetConfig {
                path: std::env::var("FEED_DATASET_PATH")
                    .unwrap_or_else(|_| "./data/dataset.json".to_string()),
            },
        })
    }
}

/// Comma-separated slot indices, e.g. `4,9`.
pub fn parse_slots(raw: &str) -> Result<Vec<usize>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_recommendation_slots() -> Vec<usize> {
    vec![4, 9]
}
