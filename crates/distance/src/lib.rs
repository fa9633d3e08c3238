//! # xview Distance
//!
//! Squared Euclidean distance matrices between batches of embedding vectors.
//! This is the numeric core shared by hard-negative mining during training and
//! recall evaluation over the full ground-to-aerial gallery.
//!
//! ## Contract
//!
//! Given a query batch `X` (`N x D`) and a gallery batch `Y` (`M x D`), every
//! form returns `D[i, j] = sum_d (X[i, d] - Y[j, d])²` with no square root.
//! The functions are pure: no I/O, no global state, and identical inputs give
//! identical outputs.
//!
//! Zero-row inputs fail with [`DistanceError::EmptyBatch`] and differing
//! embedding widths fail with [`DistanceError::DimensionMismatch`].
//!
//! ## Example
//!
//! ```
//! use distance::{DistanceEngine, EmbeddingBatch};
//!
//! let ground = EmbeddingBatch::from_rows(vec![vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
//! let aerial = EmbeddingBatch::from_rows(vec![vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
//!
//! let d = DistanceEngine::default().pairwise(&ground, &aerial).unwrap();
//! assert_eq!(d.get(0, 0), 1.0);
//! assert_eq!(d.get(1, 1), 0.0);
//! ```

mod batch;
mod engine;
mod error;

pub use crate::batch::{DistanceMatrix, EmbeddingBatch, EMBEDDING_DIM};
pub use crate::engine::{
    paired_distances, pairwise_broadcast, pairwise_linalg, pairwise_loop, DistanceEngine,
    DistanceMethod, DEFAULT_BROADCAST_MAX_ELEMENTS,
};
pub use crate::error::{BatchSide, DistanceError};
