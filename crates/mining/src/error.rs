use distance::DistanceError;
use thiserror::Error;

/// Errors surfaced by hard-negative mining and triplet loss.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    /// Anchor, positive and negative batches must have the same number of rows.
    #[error("misaligned triplet batches: anchor={anchor}, positive={positive}, negative={negative}")]
    Misaligned {
        anchor: usize,
        positive: usize,
        negative: usize,
    },
    /// Mining pairs every anchor with one negative row.
    #[error("anchor batch has {anchor} rows but negative batch has {negative}")]
    NegativeCount { anchor: usize, negative: usize },
    /// Margin must be finite and non-negative.
    #[error("invalid triplet margin: {0}")]
    InvalidMargin(f32),
    #[error(transparent)]
    Distance(#[from] DistanceError),
}
