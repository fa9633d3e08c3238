//! Rank-based recall over a square query-to-gallery matrix.
//!
//! Query `i`'s true match is gallery item `i`. Its rank is one plus the number
//! of gallery items scored strictly better than the true match, so ties with
//! the true match resolve in its favour.

use distance::DistanceMatrix;
use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::RecallError;
use crate::report::RecallReport;
use crate::thresholds::RecallThresholds;

/// Which direction of the score means "closer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Distances: smaller is better.
    #[default]
    Ascending,
    /// Similarities: larger is better.
    Descending,
}

impl RankOrder {
    #[inline]
    fn beats(self, candidate: f32, target: f32) -> bool {
        match self {
            RankOrder::Ascending => candidate < target,
            RankOrder::Descending => candidate > target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecallEvaluator {
    pub order: RankOrder,
    /// Rank rows on the rayon pool.
    pub use_parallel: bool,
}

impl RecallEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: RankOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// One-based rank of each query's true match.
    ///
    /// A query whose own score is NaN gets rank `n + 1` and never counts as a hit.
    pub fn ranks(&self, distances: &DistanceMatrix) -> Result<Vec<usize>, RecallError> {
        validate(distances)?;
        let n = distances.rows();
        let order = self.order;
        let ranks: Vec<usize> = if self.use_parallel {
            (0..n)
                .into_par_iter()
                .map(|i| rank_of(distances.row(i), i, order))
                .collect()
        } else {
            (0..n).map(|i| rank_of(distances.row(i), i, order)).collect()
        };
        Ok(ranks)
    }

    /// Percentage of queries whose true match ranks within each cut-off.
    pub fn evaluate(&self, distances: &DistanceMatrix) -> Result<RecallReport, RecallError> {
        let ranks = self.ranks(distances)?;
        let n = ranks.len();
        let thresholds = RecallThresholds::for_gallery(n);

        let unranked = ranks.iter().filter(|&&r| r > n).count();
        if unranked > 0 {
            tracing::warn!(unranked, queries = n, "queries with NaN match score");
        }

        let mut values = [0.0f64; 6];
        for (value, k) in values.iter_mut().zip(thresholds.iter()) {
            let hits = ranks.iter().filter(|&&r| r <= k).count();
            *value = 100.0 * hits as f64 / n as f64;
        }
        tracing::debug!(queries = n, order = ?self.order, ?values, "recall evaluated");

        Ok(RecallReport {
            values,
            thresholds,
            queries: n,
        })
    }
}

fn validate(distances: &DistanceMatrix) -> Result<(), RecallError> {
    if distances.rows() == 0 {
        return Err(RecallError::EmptyMatrix);
    }
    if !distances.is_square() {
        return Err(RecallError::NotSquare {
            rows: distances.rows(),
            cols: distances.cols(),
        });
    }
    Ok(())
}

fn rank_of(row: ArrayView1<'_, f32>, i: usize, order: RankOrder) -> usize {
    let target = row[i];
    if target.is_nan() {
        return row.len() + 1;
    }
    1 + row.iter().filter(|&&v| order.beats(v, target)).count()
}
