use std::path::PathBuf;

use distance::DistanceError;
use mining::MiningError;
use recall::RecallError;
use thiserror::Error;

/// Failure reported by an external collaborator: the embedding network or
/// the dataset feeding it.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("model failure: {0}")]
    Model(String),

    #[error("dataset failure: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("weights serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that abort a training or evaluation run.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error(transparent)]
    Recall(#[from] RecallError),

    #[error("failed to save weights to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("failed to restore weights from {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("failed to append losses to {path}: {source}")]
    LossLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset produced no batches")]
    EmptyDataset,
}
