//! In-memory store implementing every storage collaborator.
//!
//! Backs the replay binary and the tests; loads from a JSON dataset.

use super::{
    AccessFilter, CommentStore, ContentStore, EmbeddingStore, FindOptions, Projection, Selector,
    VoteStore,
};
use crate::models::{Comment, ItemId, Post, UserId, Vote};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub embeddings: HashMap<ItemId, Vec<f32>>,
    /// viewer id -> ids of posts the viewer has read
    #[serde(default)]
    pub read_statuses: HashMap<UserId, HashSet<ItemId>>,
    /// Posts the access filter removes for everyone.
    #[serde(default)]
    pub hidden: HashSet<ItemId>,
}

pub struct MemoryStore {
    dataset: Dataset,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(raw).context("Failed to parse dataset")?;
        debug!(
            posts = dataset.posts.len(),
            votes = dataset.votes.len(),
            comments = dataset.comments.len(),
            embeddings = dataset.embeddings.len(),
            "Loaded in-memory dataset"
        );
        Ok(Self::new(dataset))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn matches(&self, selector: &Selector, post: &Post) -> bool {
        match selector {
            Selector::All => true,
            Selector::And(clauses) => clauses.iter().all(|s| self.matches(s, post)),
            Selector::Or(clauses) => clauses.iter().any(|s| self.matches(s, post)),
            Selector::Not(inner) => !self.matches(inner, post),
            Selector::Ids(ids) => ids.iter().any(|id| id == &post.id),
            Selector::Compare { field, op, value } => post
                .field_value(*field)
                .and_then(|v| v.compare(value))
                .map(|ordering| op.holds(ordering))
                .unwrap_or(false),
            Selector::Exists(field) => post.field_value(*field).is_some(),
            Selector::Published => !post.draft,
            Selector::RecommendationsEnabled => !post.disable_recommendation,
            Selector::DefaultRecommendation => post.default_recommendation,
            Selector::UnreadBy(viewer) => !self
                .dataset
                .read_statuses
                .get(viewer)
                .map(|read| read.contains(&post.id))
                .unwrap_or(false),
        }
    }
}

fn compare_posts(a: &Post, b: &Post, options: &FindOptions) -> Ordering {
    for spec in &options.sort {
        // Missing values sort before present ones ascending, after them descending.
        let ordering = match (a.field_value(spec.field), b.field_value(spec.field)) {
            (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = spec.direction.apply(ordering);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find(&self, selector: &Selector, options: &FindOptions) -> Result<Vec<Post>> {
        let mut rows: Vec<Post> = self
            .dataset
            .posts
            .iter()
            .filter(|p| self.matches(selector, p))
            .cloned()
            .collect();

        rows.sort_by(|a, b| compare_posts(a, b, options));

        if let Some(limit) = options.limit {
            rows.truncate(limit);
        }

        if options.projection == Projection::ScoreFields {
            for row in &mut rows {
                row.contents = None;
            }
        }

        Ok(rows)
    }
}

#[async_trait]
impl AccessFilter for MemoryStore {
    /// Hidden posts are never visible; drafts only to their author.
    async fn filter<'a>(&self, viewer: Option<&'a str>, posts: Vec<Post>) -> Result<Vec<Post>> {
        Ok(posts
            .into_iter()
            .filter(|p| !self.dataset.hidden.contains(&p.id))
            .filter(|p| !p.draft || (viewer.is_some() && p.author_id.as_deref() == viewer))
            .collect())
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    async fn get(&self, item_id: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.dataset.embeddings.get(item_id).cloned())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn votes_for(&self, item_ids: &[ItemId]) -> Result<Vec<Vote>> {
        let wanted: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
        Ok(self
            .dataset
            .votes
            .iter()
            .filter(|v| wanted.contains(v.document_id.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn last_comment_before(
        &self,
        item_ids: &[ItemId],
        before: DateTime<Utc>,
    ) -> Result<HashMap<ItemId, DateTime<Utc>>> {
        let wanted: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
        let mut latest: HashMap<ItemId, DateTime<Utc>> = HashMap::new();

        for comment in &self.dataset.comments {
            if comment.deleted
                || comment.posted_at >= before
                || !wanted.contains(comment.post_id.as_str())
            {
                continue;
            }
            latest
                .entry(comment.post_id.clone())
                .and_modify(|t| *t = (*t).max(comment.posted_at))
                .or_insert(comment.posted_at);
        }

        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Comparison, Field, FieldValue, SortDirection};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn store() -> MemoryStore {
        let mut draft = Post::new("draft", t0(), 90.0);
        draft.draft = true;
        draft.author_id = Some("alice".into());

        let mut full = Post::new("b", t0() + Duration::hours(1), 20.0);
        full.contents = Some("body".into());

        let mut dataset = Dataset {
            posts: vec![Post::new("a", t0(), 50.0), full, Post::new("c", t0(), 70.0), draft],
            ..Default::default()
        };
        dataset
            .read_statuses
            .insert("bob".into(), ["c".to_string()].into_iter().collect());
        dataset.hidden.insert("a".into());
        dataset.comments = vec![
            Comment {
                post_id: "a".into(),
                posted_at: t0() + Duration::hours(2),
                deleted: false,
            },
            Comment {
                post_id: "a".into(),
                posted_at: t0() + Duration::hours(5),
                deleted: false,
            },
            Comment {
                post_id: "a".into(),
                posted_at: t0() + Duration::hours(3),
                deleted: true,
            },
        ];
        MemoryStore::new(dataset)
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_limits() {
        let store = store();
        let selector = Selector::Published.and(Selector::compare(
            Field::BaseScore,
            Comparison::Gte,
            FieldValue::Number(50.0),
        ));
        let rows = store
            .find(
                &selector,
                &FindOptions::new()
                    .sort_by(Field::BaseScore, SortDirection::Desc)
                    .limit(5),
            )
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["c", "a"]);

        let rows = store
            .find(&Selector::All, &FindOptions::new().limit(2))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_find_score_fields_projection() {
        let store = store();
        let options = FindOptions::new().projection(Projection::ScoreFields);
        let rows = store
            .find(&Selector::Ids(vec!["b".into()]), &options)
            .await
            .unwrap();
        assert_eq!(rows[0].contents, None);

        let rows = store
            .find(&Selector::Ids(vec!["b".into()]), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(rows[0].contents.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn test_unread_by() {
        let store = store();
        let rows = store
            .find(
                &Selector::Published.and(Selector::UnreadBy("bob".into())),
                &FindOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_access_filter() {
        let store = store();
        let all = store.find(&Selector::All, &FindOptions::new()).await.unwrap();

        let anonymous = store.filter(None, all.clone()).await.unwrap();
        assert_eq!(ids(&anonymous), vec!["b", "c"]);

        let author = store.filter(Some("alice"), all).await.unwrap();
        assert_eq!(ids(&author), vec!["b", "c", "draft"]);
    }

    #[tokio::test]
    async fn test_last_comment_before() {
        let store = store();
        let ids = vec!["a".to_string(), "b".to_string()];

        let latest = store
            .last_comment_before(&ids, t0() + Duration::hours(4))
            .await
            .unwrap();
        assert_eq!(latest.get("a"), Some(&(t0() + Duration::hours(2))));
        assert!(!latest.contains_key("b"));
    }
}
