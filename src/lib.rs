//! Workspace umbrella crate for cross-view (ground-to-aerial) image retrieval.
//!
//! The numeric core lives in three member crates and is re-exported here:
//!
//! - `distance`: squared Euclidean distance matrices between embedding batches.
//! - `mining`: batch-local hard-negative mining and the triplet loss.
//! - `recall`: recall@K over a query-to-gallery distance matrix.
//!
//! This crate adds the orchestration around them: the [`Trainer`] and
//! [`Evaluator`] loops, the [`SiameseNetwork`] and [`TripletDataset`] seams to
//! an external learning framework, YAML configuration, a global metrics hook
//! and a deterministic [`StubSiamese`] for demos and tests.

pub mod config;
mod error;
mod eval;
mod loss_log;
mod metrics;
mod network;
mod progress;
pub mod runtime;
mod stub;
mod train;

pub use distance::{
    BatchSide, DEFAULT_BROADCAST_MAX_ELEMENTS, DistanceEngine, DistanceError, DistanceMatrix,
    DistanceMethod, EMBEDDING_DIM, EmbeddingBatch, paired_distances, pairwise_broadcast,
    pairwise_linalg, pairwise_loop,
};
pub use mining::{
    DEFAULT_MARGIN, HardTripletMiner, MinedNegatives, MiningError, TripletDistances, TripletLoss,
    triplet_distances, triplet_loss,
};
pub use recall::{RankOrder, RecallError, RecallEvaluator, RecallReport, RecallThresholds};

pub use crate::config::{ConfigLoadError, XviewConfig};
pub use crate::error::{BackendError, TrainError};
pub use crate::eval::Evaluator;
pub use crate::loss_log::{LossEntry, LossLog};
pub use crate::metrics::{TrainingMetrics, set_training_metrics};
pub use crate::network::{SiameseNetwork, TripletBatch, TripletDataset, TripletStep};
pub use crate::progress::Progress;
pub use crate::stub::{StubSiamese, SyntheticDataset};
pub use crate::train::{EpochSummary, TrainSummary, Trainer};
