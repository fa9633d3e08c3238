//! # xview Mining
//!
//! Batch-local hard-negative mining and the triplet objective for the
//! ground-to-aerial network.
//!
//! For each anchor, [`HardTripletMiner`] swaps the naively paired negative for
//! the negative in the same batch that currently sits closest to the anchor.
//! Ties go to the lowest row index. A batch of one is returned unchanged.
//!
//! ```
//! use distance::EmbeddingBatch;
//! use mining::{triplet_loss, HardTripletMiner, DEFAULT_MARGIN};
//!
//! let anchor = EmbeddingBatch::from_rows(vec![vec![0.0], vec![5.0]]).unwrap();
//! let positive = anchor.clone();
//! let negative = EmbeddingBatch::from_rows(vec![vec![4.0], vec![0.5]]).unwrap();
//!
//! let hard = HardTripletMiner::default().mine(&anchor, &positive, &negative).unwrap();
//! assert_eq!(hard.row(0)[0], 0.5);
//!
//! let loss = triplet_loss(&anchor, &positive, &hard, DEFAULT_MARGIN).unwrap();
//! assert!(loss.mean > 0.0);
//! ```

mod error;
mod loss;
mod miner;

pub use crate::error::MiningError;
pub use crate::loss::{
    triplet_distances, triplet_loss, TripletDistances, TripletLoss, DEFAULT_MARGIN,
};
pub use crate::miner::{HardTripletMiner, MinedNegatives};
