//! Seams to the external learning framework.
//!
//! The core never runs a forward or backward pass itself. A [`SiameseNetwork`]
//! turns images into embeddings and consumes finished [`TripletStep`]s, and a
//! [`TripletDataset`] supplies the image triplets.

use std::path::Path;

use distance::EmbeddingBatch;
use mining::TripletLoss;

use crate::error::BackendError;

/// One batch of image triplets: a ground photo, its matching aerial image and
/// a non-matching aerial image per row.
#[derive(Debug, Clone, PartialEq)]
pub struct TripletBatch<I> {
    pub ground: Vec<I>,
    pub positive: Vec<I>,
    pub negative: Vec<I>,
}

impl<I> TripletBatch<I> {
    pub fn len(&self) -> usize {
        self.ground.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ground.is_empty()
    }
}

/// Everything the framework needs for one optimizer update.
#[derive(Debug, Clone)]
pub struct TripletStep {
    pub anchor: EmbeddingBatch,
    pub positive: EmbeddingBatch,
    /// Negatives after mining, or the naive pairing when mining is off.
    pub negative: EmbeddingBatch,
    /// Row of the original negative batch chosen for each anchor.
    pub mined_indices: Option<Vec<usize>>,
    pub loss: TripletLoss,
}

/// Two-branch embedding network with a shared training step.
pub trait SiameseNetwork {
    type Input;

    fn embed_ground(&self, inputs: &[Self::Input]) -> Result<EmbeddingBatch, BackendError>;

    fn embed_aerial(&self, inputs: &[Self::Input]) -> Result<EmbeddingBatch, BackendError>;

    /// Apply a single optimizer update for `step`. Either the whole update
    /// lands or the call fails.
    fn apply_gradients(&mut self, step: &TripletStep) -> Result<(), BackendError>;

    fn save_weights(&self, path: &Path) -> Result<(), BackendError>;

    /// Replace the current parameters with ones written by
    /// [`save_weights`](Self::save_weights).
    fn load_weights(&mut self, path: &Path) -> Result<(), BackendError>;
}

/// Finite, ordered source of triplet batches.
pub trait TripletDataset {
    type Input;

    /// Number of batches [`batches`](Self::batches) yields.
    fn steps(&self) -> usize;

    fn batches(&self) -> impl Iterator<Item = Result<TripletBatch<Self::Input>, BackendError>> + '_;
}
