use chrono::{DateTime, Utc};
use ranking_service::models::{Post, RubricEntry};
use ranking_service::services::RecommendationRequest;
use ranking_service::storage::{FieldValue, SortDirection};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;

/// Position of an item in a sorted source. Dates serialize as RFC 3339
/// strings, numbers as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortKey {
    Date(DateTime<Utc>),
    Number(f64),
}

impl SortKey {
    pub fn kind(&self) -> &'static str {
        match self {
            SortKey::Date(_) => "date",
            SortKey::Number(_) => "number",
        }
    }

    /// `None` when the kinds differ.
    pub fn cmp_same_kind(&self, other: &SortKey) -> Option<Ordering> {
        FieldValue::from(*self).compare(&FieldValue::from(*other))
    }

    /// Strictly past `cutoff` when reading in `direction`.
    pub fn is_beyond(&self, cutoff: &SortKey, direction: SortDirection) -> bool {
        match self.cmp_same_kind(cutoff) {
            Some(ordering) => direction.apply(ordering) == Ordering::Greater,
            None => false,
        }
    }
}

impl From<SortKey> for FieldValue {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Date(d) => FieldValue::Date(d),
            SortKey::Number(n) => FieldValue::Number(n),
        }
    }
}

impl From<FieldValue> for SortKey {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Date(d) => SortKey::Date(d),
            FieldValue::Number(n) => SortKey::Number(n),
        }
    }
}

/// Post placed by the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedPost {
    #[serde(flatten)]
    pub post: Post,
    pub score: f64,
    pub features_rubric: Vec<RubricEntry>,
    /// Selection rank, 0-based.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedPayload {
    Post(Post),
    Recommendation(RecommendedPost),
}

impl FeedPayload {
    pub fn post(&self) -> &Post {
        match self {
            FeedPayload::Post(post) => post,
            FeedPayload::Recommendation(rec) => &rec.post,
        }
    }

    pub fn id(&self) -> &str {
        &self.post().id
    }
}

/// One merged feed item. Serializes as `{type, sortKey, <type>: payload}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub item_type: &'static str,
    pub sort_key: SortKey,
    pub fixed_position: bool,
    pub payload: FeedPayload,
}

impl Serialize for FeedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", self.item_type)?;
        map.serialize_entry("sortKey", &self.sort_key)?;
        map.serialize_entry(self.item_type, &self.payload)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub results: Vec<FeedEntry>,
    /// Sort key of the last ordered item; pass back as `cutoff`.
    pub cutoff: Option<SortKey>,
    /// Pass back as `offset`.
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotlightArgs {
    pub item_id: String,
    /// Defaults to the configured spotlight slot.
    #[serde(default)]
    pub slot: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedRequest {
    pub limit: Option<usize>,
    pub cutoff: Option<SortKey>,
    pub offset: Option<i64>,
    pub sort_direction: Option<SortDirection>,
    pub spotlight: Option<SpotlightArgs>,
    pub recommendations: Option<RecommendationRequest>,
    /// Defaults to the configured recommendation slots.
    pub recommendation_slots: Option<Vec<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ranking_service::models::FeatureMode;

    fn date(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_sort_key_untagged() {
        let key: SortKey = serde_json::from_str("\"2024-01-01T05:00:00Z\"").unwrap();
        assert_eq!(key, SortKey::Date(date(5)));
        let key: SortKey = serde_json::from_str("8").unwrap();
        assert_eq!(key, SortKey::Number(8.0));

        assert_eq!(
            serde_json::to_value(SortKey::Date(date(5))).unwrap(),
            serde_json::json!("2024-01-01T05:00:00Z")
        );
    }

    #[test]
    fn test_is_beyond_is_strict() {
        let cutoff = SortKey::Number(8.0);
        assert!(SortKey::Number(7.0).is_beyond(&cutoff, SortDirection::Desc));
        assert!(!SortKey::Number(8.0).is_beyond(&cutoff, SortDirection::Desc));
        assert!(SortKey::Number(9.0).is_beyond(&cutoff, SortDirection::Asc));
        assert!(!SortKey::Date(date(1)).is_beyond(&cutoff, SortDirection::Desc));
    }

    #[test]
    fn test_entry_serialization() {
        let post = Post::new("p1", date(3), 12.0);
        let entry = FeedEntry {
            item_type: "recommendation",
            sort_key: SortKey::Number(4.0),
            fixed_position: true,
            payload: FeedPayload::Recommendation(RecommendedPost {
                post,
                score: 1.5,
                features_rubric: vec![RubricEntry {
                    feature: "karma".into(),
                    mode: FeatureMode::Additive,
                    value: 1.5,
                }],
                rank: 0,
            }),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "recommendation");
        assert_eq!(json["sortKey"], 4.0);
        assert_eq!(json["recommendation"]["id"], "p1");
        assert_eq!(json["recommendation"]["baseScore"], 12.0);
        assert_eq!(json["recommendation"]["featuresRubric"][0]["feature"], "karma");
    }

    #[test]
    fn test_feed_request_defaults() {
        let request: FeedRequest =
            serde_json::from_str(r#"{"limit": 5, "cutoff": 10, "sortDirection": "asc"}"#).unwrap();
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.cutoff, Some(SortKey::Number(10.0)));
        assert_eq!(request.sort_direction, Some(SortDirection::Asc));
        assert!(request.recommendations.is_none());
    }
}
