// ============================================
// Storage Collaborators
// ============================================
//
// The engine never issues raw queries. It composes a `Selector` plus
// sort/limit/projection options and hands them to a `ContentStore`.
// Permission checks, embeddings, vote history and comment history are
// separate read-only collaborators.

pub mod memory;

pub use memory::{Dataset, MemoryStore};

use crate::models::{ItemId, Post, UserId, Vote};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// Post fields that can be filtered and sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    PostedAt,
    BaseScore,
    LastCommentedAt,
    CuratedDate,
    FrontpageDate,
    DefaultRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Date(DateTime<Utc>),
    Number(f64),
}

impl FieldValue {
    /// Values of different kinds are not comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Number(a), FieldValue::Number(b)) => Some(a.total_cmp(b)),
            _ => None,
        }
    }
}

impl Post {
    pub fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::PostedAt => Some(FieldValue::Date(self.posted_at)),
            Field::BaseScore => Some(FieldValue::Number(self.base_score)),
            Field::LastCommentedAt => self.last_commented_at.map(FieldValue::Date),
            Field::CuratedDate => self.curated_date.map(FieldValue::Date),
            Field::FrontpageDate => self.frontpage_date.map(FieldValue::Date),
            Field::DefaultRecommendation => Some(FieldValue::Number(if self.default_recommendation {
                1.0
            } else {
                0.0
            })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Orient an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("invalid sort direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
        }
    }
}

/// Query predicate over posts.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    And(Vec<Selector>),
    Or(Vec<Selector>),
    Not(Box<Selector>),
    Ids(Vec<ItemId>),
    /// False when the field is missing or of a different kind.
    Compare {
        field: Field,
        op: Comparison,
        value: FieldValue,
    },
    Exists(Field),
    Published,
    RecommendationsEnabled,
    DefaultRecommendation,
    UnreadBy(UserId),
}

impl Selector {
    pub fn compare(field: Field, op: Comparison, value: FieldValue) -> Self {
        Selector::Compare { field, op, value }
    }

    /// Items strictly past `cutoff` when reading in `direction`.
    pub fn beyond(field: Field, direction: SortDirection, cutoff: FieldValue) -> Self {
        let op = match direction {
            SortDirection::Desc => Comparison::Lt,
            SortDirection::Asc => Comparison::Gt,
        };
        Selector::compare(field, op, cutoff)
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    pub fn and(self, other: Selector) -> Self {
        let mut clauses = Vec::new();
        for s in [self, other] {
            match s {
                Selector::All => {}
                Selector::And(inner) => clauses.extend(inner),
                s => clauses.push(s),
            }
        }
        match clauses.len() {
            0 => Selector::All,
            1 => clauses.remove(0),
            _ => Selector::And(clauses),
        }
    }

    pub fn or(self, other: Selector) -> Self {
        match self {
            Selector::Or(mut inner) => {
                inner.push(other);
                Selector::Or(inner)
            }
            s => Selector::Or(vec![s, other]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Full,
    /// Only the fields selection needs; heavy fields are dropped.
    ScoreFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    pub limit: Option<usize>,
    pub projection: Projection,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, field: Field, direction: SortDirection) -> Self {
        self.sort.push(SortSpec { field, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Storage query service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find(&self, selector: &Selector, options: &FindOptions) -> Result<Vec<Post>>;
}

/// Permission filter, applied after selection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessFilter: Send + Sync {
    async fn filter<'a>(&self, viewer: Option<&'a str>, posts: Vec<Post>) -> Result<Vec<Post>>;
}

/// Precomputed embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn get(&self, item_id: &str) -> Result<Option<Vec<f32>>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn votes_for(&self, item_ids: &[ItemId]) -> Result<Vec<Vote>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Latest non-deleted comment strictly before `before`, per item.
    /// Items without one are absent from the map.
    async fn last_comment_before(
        &self,
        item_ids: &[ItemId],
        before: DateTime<Utc>,
    ) -> Result<HashMap<ItemId, DateTime<Utc>>>;
}
