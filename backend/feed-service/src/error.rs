/// Error types for Feed Service
///
/// Configuration and request errors are caller mistakes and abort the
/// page. Subquery failures are fetch errors; a page is never served with
/// one of its sources missing.
use ranking_service::RankingError;
use thiserror::Error;

/// Result type for feed-service operations
pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Ordered subqueries disagree on sort key type
    #[error("Subquery {item_type} sorts by {found} but other subqueries sort by {expected}")]
    MixedSortKeys {
        item_type: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cutoff is a {found} but subqueries sort by {expected}")]
    CutoffTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Fixed-position slot that is not a finite non-negative integer
    #[error("Invalid slot index {slot} from subquery {item_type}")]
    InvalidSlot { item_type: String, slot: String },

    #[error("Item {item_id} from subquery {item_type} has no sort key")]
    MissingSortKey { item_type: String, item_id: String },

    /// Ordered item whose numeric sort key is NaN or infinite
    #[error("Item {item_id} from subquery {item_type} has non-finite sort key {key}")]
    NonFiniteSortKey {
        item_type: String,
        item_id: String,
        key: f64,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Subquery {item_type} failed: {message}")]
    SubqueryFailed { item_type: String, message: String },

    #[error("Access filter failed: {0}")]
    AccessFilterFailed(String),

    #[error(transparent)]
    Ranking(#[from] RankingError),
}

impl FeedError {
    pub fn subquery_failed(item_type: &str, err: anyhow::Error) -> Self {
        FeedError::SubqueryFailed {
            item_type: item_type.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        match self {
            FeedError::SubqueryFailed { .. } | FeedError::AccessFilterFailed(_) => false,
            FeedError::Ranking(err) => err.is_configuration_error(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(FeedError::BadRequest("offset".into()).is_configuration_error());
        assert!(!FeedError::subquery_failed("newPost", anyhow::anyhow!("timeout"))
            .is_configuration_error());
        assert!(FeedError::from(RankingError::UnknownFeature("x".into())).is_configuration_error());
    }

    #[test]
    fn test_ranking_error_is_transparent() {
        let err = FeedError::from(RankingError::UnknownAlgorithm("newest".into()));
        assert_eq!(err.to_string(), "Unrecognized recommendation algorithm: newest");
    }
}
