pub mod features;
pub mod ranking;
pub mod recommendation;
pub mod sampling;
pub mod selection;

pub use features::{FeatureName, FeatureRegistry, FeatureRequest, ScoringFeature};
pub use ranking::FeaturePipeline;
pub use recommendation::{
    CandidateWindow, RecommendationAlgorithm, RecommendationRequest, RecommendationService,
};
pub use sampling::WeightedSampler;
pub use selection::{CandidateSelector, SelectionMethod};
