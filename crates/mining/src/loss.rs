//! Triplet objective over row-aligned anchor, positive and negative batches.

use distance::{paired_distances, EmbeddingBatch};
use serde::Serialize;

use crate::error::MiningError;

/// Margin the cross-view model trains with.
pub const DEFAULT_MARGIN: f32 = 0.5;

/// Row-wise squared distances for one triplet batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripletDistances {
    /// `||a[i] - p[i]||²`
    pub anchor_positive: Vec<f32>,
    /// `||a[i] - n[i]||²`
    pub anchor_negative: Vec<f32>,
}

/// Per-sample hinge values and their batch mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripletLoss {
    pub per_sample: Vec<f32>,
    pub mean: f32,
}

impl TripletLoss {
    /// Samples that still violate the margin and therefore carry gradient.
    pub fn active(&self) -> usize {
        self.per_sample.iter().filter(|&&l| l > 0.0).count()
    }
}

pub fn triplet_distances(
    anchor: &EmbeddingBatch,
    positive: &EmbeddingBatch,
    negative: &EmbeddingBatch,
) -> Result<TripletDistances, MiningError> {
    if anchor.len() != positive.len() || anchor.len() != negative.len() {
        return Err(MiningError::Misaligned {
            anchor: anchor.len(),
            positive: positive.len(),
            negative: negative.len(),
        });
    }
    Ok(TripletDistances {
        anchor_positive: paired_distances(anchor, positive)?,
        anchor_negative: paired_distances(anchor, negative)?,
    })
}

/// `loss[i] = max(ap[i] - an[i] + margin, 0)`.
pub fn triplet_loss(
    anchor: &EmbeddingBatch,
    positive: &EmbeddingBatch,
    negative: &EmbeddingBatch,
    margin: f32,
) -> Result<TripletLoss, MiningError> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(MiningError::InvalidMargin(margin));
    }
    let distances = triplet_distances(anchor, positive, negative)?;
    let per_sample: Vec<f32> = distances
        .anchor_positive
        .iter()
        .zip(&distances.anchor_negative)
        .map(|(ap, an)| (ap - an + margin).max(0.0))
        .collect();
    let mean = per_sample.iter().sum::<f32>() / per_sample.len() as f32;
    Ok(TripletLoss { per_sample, mean })
}

#[cfg(test)]
mod tests {
    use super::*;
    use distance::DistanceError;

    fn batch(rows: Vec<Vec<f32>>) -> EmbeddingBatch {
        EmbeddingBatch::from_rows(rows).unwrap()
    }

    #[test]
    fn hinge_is_zero_once_margin_is_met() {
        let anchor = batch(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        let positive = batch(vec![vec![0.5, 0.0], vec![1.0, 0.0]]);
        let negative = batch(vec![vec![2.0, 0.0], vec![1.0, 0.0]]);

        let loss = triplet_loss(&anchor, &positive, &negative, DEFAULT_MARGIN).unwrap();
        // ap=0.25 an=4.0 -> 0; ap=1.0 an=1.0 -> 0.5
        assert_eq!(loss.per_sample, vec![0.0, 0.5]);
        assert!((loss.mean - 0.25).abs() < 1e-6);
        assert_eq!(loss.active(), 1);
    }

    #[test]
    fn distances_are_row_aligned() {
        let anchor = batch(vec![vec![0.0], vec![1.0]]);
        let positive = batch(vec![vec![1.0], vec![1.0]]);
        let negative = batch(vec![vec![3.0], vec![-1.0]]);
        let d = triplet_distances(&anchor, &positive, &negative).unwrap();
        assert_eq!(d.anchor_positive, vec![1.0, 0.0]);
        assert_eq!(d.anchor_negative, vec![9.0, 4.0]);
    }

    #[test]
    fn rejects_bad_margin() {
        let a = batch(vec![vec![0.0]]);
        for margin in [-0.1, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                triplet_loss(&a, &a, &a, margin),
                Err(MiningError::InvalidMargin(_))
            ));
        }
    }

    #[test]
    fn rejects_misaligned_and_mismatched_batches() {
        let a = batch(vec![vec![0.0], vec![0.0]]);
        let short = batch(vec![vec![0.0]]);
        assert!(matches!(
            triplet_loss(&a, &a, &short, DEFAULT_MARGIN),
            Err(MiningError::Misaligned { .. })
        ));

        let wide = batch(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert!(matches!(
            triplet_loss(&a, &wide, &a, DEFAULT_MARGIN),
            Err(MiningError::Distance(DistanceError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn mining_never_lowers_the_loss() {
        use crate::HardTripletMiner;

        let mut rng = fastrand::Rng::with_seed(5);
        let (rows, dim) = (12, 16);
        let mut sample = || {
            let values: Vec<f32> = (0..rows * dim).map(|_| rng.f32() - 0.5).collect();
            EmbeddingBatch::from_flat(rows, dim, values).unwrap()
        };
        let anchor = sample();
        let positive = sample();
        let negative = sample();

        let naive = triplet_loss(&anchor, &positive, &negative, DEFAULT_MARGIN).unwrap();
        let hard = HardTripletMiner::default()
            .mine(&anchor, &positive, &negative)
            .unwrap();
        let mined = triplet_loss(&anchor, &positive, &hard, DEFAULT_MARGIN).unwrap();
        for (n, m) in naive.per_sample.iter().zip(&mined.per_sample) {
            assert!(m + 1e-4 >= *n);
        }
    }
}
