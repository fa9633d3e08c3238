use thiserror::Error;

/// Errors surfaced by recall evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecallError {
    #[error("distance matrix has no queries")]
    EmptyMatrix,
    /// Query `i` is matched by gallery item `i`, so the matrix must be square.
    #[error("distance matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_square_reports_shape() {
        let err = RecallError::NotSquare { rows: 3, cols: 4 };
        assert_eq!(err.to_string(), "distance matrix must be square, got 3x4");
    }
}
