//! Ranking error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Unknown scoring feature: {0}")]
    UnknownFeature(String),

    #[error("Unrecognized recommendation algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid options for feature {feature}: {message}")]
    InvalidFeatureOptions { feature: String, message: String },

    #[error("Vector length mismatch: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("Invalid sample weight {weight} at pool index {index}")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("Feature {feature} returned {actual} scores for {expected} candidates")]
    FeatureOutputMismatch {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to fetch {what}: {message}")]
    DataFetch { what: &'static str, message: String },
}

impl RankingError {
    /// Wrap a collaborator failure. The full context chain is kept in the message.
    pub fn data_fetch(what: &'static str, err: anyhow::Error) -> Self {
        RankingError::DataFetch {
            what,
            message: format!("{:#}", err),
        }
    }

    /// Configuration errors are caller mistakes; everything else is a failed read.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, RankingError::DataFetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, RankingError>;
