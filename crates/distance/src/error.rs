use thiserror::Error;

/// Which input of a pairwise computation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSide {
    Query,
    Gallery,
}

impl std::fmt::Display for BatchSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchSide::Query => f.write_str("query"),
            BatchSide::Gallery => f.write_str("gallery"),
        }
    }
}

/// Errors surfaced while building batches or computing distances.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceError {
    /// The two batches do not share an embedding dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// A batch with zero rows was handed to the engine.
    #[error("{side} batch is empty")]
    EmptyBatch { side: BatchSide },
    /// Construction input did not describe a rectangular matrix.
    #[error("invalid shape: {0}")]
    Shape(String),
}
