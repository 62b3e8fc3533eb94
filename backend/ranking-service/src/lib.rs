pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{RankingError, Result};
pub use services::{
    CandidateSelector, FeatureName, FeaturePipeline, FeatureRegistry, FeatureRequest,
    RecommendationAlgorithm, RecommendationRequest, RecommendationService, ScoringFeature,
    SelectionMethod, WeightedSampler,
};
