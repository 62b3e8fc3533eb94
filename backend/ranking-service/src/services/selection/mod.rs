// ============================================
// Candidate Selection
// ============================================
//
// Picks `count` winners from a scored pool, either deterministically
// (top-N) or by weighted sampling without replacement. An always-include
// set is placed first and excluded from the ranked or sampled remainder.
//
// Selection runs on the score-fields projection. Only the winners are
// re-fetched in full.

use crate::error::{RankingError, Result};
use crate::models::{Identified, ItemId, Post};
use crate::services::sampling::WeightedSampler;
use crate::storage::{ContentStore, FindOptions, Selector, SortSpec};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    #[default]
    Top,
    Sample,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Top => "top",
            SelectionMethod::Sample => "sample",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMethod {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(SelectionMethod::Top),
            "sample" => Ok(SelectionMethod::Sample),
            other => Err(RankingError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Drop repeated ids from `always`, and every `always` id from `pool`.
fn split_always<T: Identified>(pool: Vec<T>, always: Vec<T>) -> (Vec<T>, Vec<T>) {
    let mut seen: HashSet<String> = HashSet::new();
    let always: Vec<T> = always
        .into_iter()
        .filter(|item| seen.insert(item.item_id().to_string()))
        .collect();
    let pool: Vec<T> = pool
        .into_iter()
        .filter(|item| !seen.contains(item.item_id()))
        .collect();
    (pool, always)
}

/// Always-include first, then the pool by descending score.
///
/// Ties keep pool order; NaN scores rank last.
pub fn select_top<T, F>(pool: Vec<T>, always: Vec<T>, count: usize, score_fn: F) -> Vec<T>
where
    T: Identified,
    F: Fn(&T) -> f64,
{
    let (pool, mut selected) = split_always(pool, always);

    let mut scored: Vec<(f64, T)> = pool
        .into_iter()
        .map(|item| (score_fn(&item), item))
        .collect();
    scored.sort_by(|a, b| rank_order(a.0, b.0));

    selected.extend(scored.into_iter().map(|(_, item)| item));
    selected.truncate(count);
    selected
}

/// Always-include first, then `count - |always|` weighted draws from the pool.
pub fn select_sample<T, F, R>(
    pool: Vec<T>,
    always: Vec<T>,
    count: usize,
    weight_fn: F,
    rng: &mut R,
) -> Result<Vec<T>>
where
    T: Identified,
    F: Fn(&T) -> f64,
    R: Rng,
{
    let (pool, mut selected) = split_always(pool, always);
    let draws = count.saturating_sub(selected.len());

    let weighted: Vec<(T, f64)> = pool
        .into_iter()
        .map(|item| {
            let weight = weight_fn(&item);
            (item, weight)
        })
        .collect();
    let mut sampler = WeightedSampler::new(weighted)?;

    selected.extend(sampler.pop(draws, rng));
    selected.truncate(count);
    Ok(selected)
}

/// Order of hydrated winners.
#[derive(Debug, Clone, PartialEq)]
pub enum HydrateOrder {
    /// Keep the order the ids were selected in.
    Selection,
    /// Let the store sort the rows.
    Stored(Vec<SortSpec>),
}

/// Re-fetches selected ids in full.
pub struct CandidateSelector {
    store: Arc<dyn ContentStore>,
}

impl CandidateSelector {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn hydrate(&self, ids: &[ItemId], order: HydrateOrder) -> Result<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut options = FindOptions::new();
        if let HydrateOrder::Stored(sort) = &order {
            options.sort = sort.clone();
        }

        let rows = self
            .store
            .find(&Selector::Ids(ids.to_vec()), &options)
            .await
            .map_err(|e| RankingError::data_fetch("selected posts", e))?;

        debug!(requested = ids.len(), fetched = rows.len(), "Hydrated selection");

        Ok(match order {
            HydrateOrder::Stored(_) => rows,
            HydrateOrder::Selection => {
                let mut by_id: HashMap<ItemId, Post> =
                    rows.into_iter().map(|p| (p.id.clone(), p)).collect();
                ids.iter().filter_map(|id| by_id.remove(id)).collect()
            }
        })
    }
}

/// Descending score order with NaN ranked last.
pub fn rank_order(a: f64, b: f64) -> Ordering {
    let a = if a.is_nan() { f64::NEG_INFINITY } else { a };
    let b = if b.is_nan() { f64::NEG_INFINITY } else { b };
    b.total_cmp(&a)
}
