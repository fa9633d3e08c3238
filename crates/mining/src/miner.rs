//! Within-batch hardest-negative selection.

use distance::{DistanceEngine, DistanceError, EmbeddingBatch};
use ndarray::ArrayView1;

use crate::error::MiningError;

/// Outcome of mining one batch: the chosen row of the negative batch for
/// every anchor, and the gathered replacement batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MinedNegatives {
    /// `indices[i]` is the negative row closest to anchor `i`.
    pub indices: Vec<usize>,
    /// `negatives[i] == negative[indices[i]]`.
    pub negatives: EmbeddingBatch,
}

impl MinedNegatives {
    /// Number of anchors whose negative differs from the naive pairing.
    pub fn replaced(&self) -> usize {
        self.indices
            .iter()
            .enumerate()
            .filter(|(i, j)| i != *j)
            .count()
    }
}

/// Replaces each anchor's naively paired negative with the closest negative
/// in the same batch.
///
/// Mining never looks outside the current batch, so its quality depends on
/// batch composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardTripletMiner {
    engine: DistanceEngine,
}

impl HardTripletMiner {
    pub fn new(engine: DistanceEngine) -> Self {
        Self { engine }
    }

    /// Return `N'` with `N'[i] = N[argmin_j ||A[i] - N[j]||²]`.
    ///
    /// The positive batch takes no part in the selection; it is checked only so
    /// that a misaligned triplet is reported here rather than in the loss.
    pub fn mine(
        &self,
        anchor: &EmbeddingBatch,
        positive: &EmbeddingBatch,
        negative: &EmbeddingBatch,
    ) -> Result<EmbeddingBatch, MiningError> {
        if anchor.len() != positive.len() || anchor.len() != negative.len() {
            return Err(MiningError::Misaligned {
                anchor: anchor.len(),
                positive: positive.len(),
                negative: negative.len(),
            });
        }
        if positive.dim() != anchor.dim() {
            return Err(DistanceError::DimensionMismatch {
                expected: anchor.dim(),
                got: positive.dim(),
            }
            .into());
        }
        Ok(self.mine_indices(anchor, negative)?.negatives)
    }

    /// Same selection as [`mine`](Self::mine), keeping the chosen indices so
    /// callers can re-gather the underlying negative images.
    pub fn mine_indices(
        &self,
        anchor: &EmbeddingBatch,
        negative: &EmbeddingBatch,
    ) -> Result<MinedNegatives, MiningError> {
        if anchor.len() != negative.len() {
            return Err(MiningError::NegativeCount {
                anchor: anchor.len(),
                negative: negative.len(),
            });
        }
        let distances = self.engine.pairwise(anchor, negative)?;

        if negative.len() == 1 {
            return Ok(MinedNegatives {
                indices: vec![0],
                negatives: negative.clone(),
            });
        }

        let indices: Vec<usize> = (0..distances.rows())
            .map(|i| argmin(distances.row(i)))
            .collect();
        let negatives = negative.select_rows(&indices)?;
        let mined = MinedNegatives { indices, negatives };
        tracing::trace!(
            batch = anchor.len(),
            replaced = mined.replaced(),
            "mined hard negatives"
        );
        Ok(mined)
    }
}

/// First index of the smallest value; NaN never beats a number.
fn argmin(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    let mut best_value = row[0];
    for (j, &value) in row.iter().enumerate().skip(1) {
        if value < best_value || (best_value.is_nan() && !value.is_nan()) {
            best = j;
            best_value = value;
        }
    }
    best
}
