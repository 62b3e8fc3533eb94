//! Weighted sampling without replacement.
//!
//! Positive-weight entries live in a cumulative-weight array searched by
//! binary search; the array is rebuilt after each draw. Zero-weight entries
//! are kept aside and only returned when the caller asks for them.

use crate::error::{RankingError, Result};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    entries: Vec<(T, f64)>,
    cumulative: Vec<f64>,
    zero_weight: Vec<T>,
}

impl<T> WeightedSampler<T> {
    /// Weights must be finite and non-negative.
    pub fn new(pool: Vec<(T, f64)>) -> Result<Self> {
        let mut entries = Vec::with_capacity(pool.len());
        let mut zero_weight = Vec::new();

        for (index, (item, weight)) in pool.into_iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RankingError::InvalidWeight { index, weight });
            }
            if weight == 0.0 {
                zero_weight.push(item);
            } else {
                entries.push((item, weight));
            }
        }

        let mut sampler = Self {
            entries,
            cumulative: Vec::new(),
            zero_weight,
        };
        sampler.rebuild();
        Ok(sampler)
    }

    fn rebuild(&mut self) {
        self.cumulative.clear();
        let mut total = 0.0;
        for (_, weight) in &self.entries {
            total += weight;
            self.cumulative.push(total);
        }
    }

    /// Positive-weight entries still available.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Draw up to `n` distinct items, each with probability proportional to
    /// its weight among those remaining. Zero-weight items are never drawn.
    pub fn pop<R: Rng>(&mut self, n: usize, rng: &mut R) -> Vec<T> {
        let mut drawn = Vec::with_capacity(n.min(self.entries.len()));

        while drawn.len() < n && !self.entries.is_empty() {
            let total = self.total_weight();
            let target = rng.gen::<f64>() * total;
            let index = self
                .cumulative
                .partition_point(|&c| c <= target)
                .min(self.entries.len() - 1);

            let (item, _) = self.entries.remove(index);
            drawn.push(item);
            self.rebuild();
        }

        if drawn.len() < n {
            debug!(
                requested = n,
                drawn = drawn.len(),
                zero_weight = self.zero_weight.len(),
                "Weighted pool exhausted"
            );
        }

        drawn
    }

    /// Like `pop`, then tops up with zero-weight items in input order.
    pub fn pop_with_zero_weight_fill<R: Rng>(&mut self, n: usize, rng: &mut R) -> Vec<T> {
        let mut drawn = self.pop(n, rng);
        let missing = n.saturating_sub(drawn.len()).min(self.zero_weight.len());
        drawn.extend(self.zero_weight.drain(..missing));
        drawn
    }
}
