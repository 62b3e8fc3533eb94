use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ItemId = String;
pub type UserId = String;

/// Content item as returned by the content store.
///
/// Selection runs over the score-fields projection, where `contents` is
/// stripped; only the winners are re-fetched in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<UserId>,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commented_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curated_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontpage_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub default_recommendation: bool,
    #[serde(default)]
    pub disable_recommendation: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

impl Post {
    /// Minimal published post, mostly for fixtures.
    pub fn new(id: impl Into<ItemId>, posted_at: DateTime<Utc>, base_score: f64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            author_id: None,
            posted_at,
            base_score,
            last_commented_at: None,
            curated_date: None,
            frontpage_date: None,
            default_recommendation: false,
            disable_recommendation: false,
            draft: false,
            contents: None,
        }
    }
}

/// Anything selection can refer to by id.
pub trait Identified {
    fn item_id(&self) -> &str;
}

impl Identified for Post {
    fn item_id(&self) -> &str {
        &self.id
    }
}

/// Per-request scoring context. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    now: DateTime<Utc>,
    viewer: Option<UserId>,
    simulated: bool,
}

impl ScoringContext {
    /// Context at wall-clock time.
    pub fn current(viewer: Option<UserId>) -> Self {
        Self::at(Utc::now(), viewer)
    }

    /// Context at an explicit time that still reflects live data.
    pub fn at(now: DateTime<Utc>, viewer: Option<UserId>) -> Self {
        Self {
            now,
            viewer,
            simulated: false,
        }
    }

    /// "What would have been recommended at `now`": features that read
    /// aggregates reconstruct them from history instead.
    pub fn as_of(now: DateTime<Utc>, viewer: Option<UserId>) -> Self {
        Self {
            now,
            viewer,
            simulated: true,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureMode {
    Additive,
    Multiplicative,
}

impl FeatureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureMode::Additive => "additive",
            FeatureMode::Multiplicative => "multiplicative",
        }
    }
}

/// One feature's raw contribution to a candidate's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricEntry {
    pub feature: String,
    pub mode: FeatureMode,
    pub value: f64,
}

/// Recommendation response item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
    pub features_rubric: Vec<RubricEntry>,
}

impl Identified for ScoredItem {
    fn item_id(&self) -> &str {
        &self.item_id
    }
}

/// Vote on a content item, used to rebuild karma as of a past time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub document_id: ItemId,
    pub power: f64,
    pub voted_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub post_id: ItemId,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}
