//! Owned embedding batches and the distance matrices computed between them.

use ndarray::{concatenate, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::DistanceError;

/// Embedding dimension produced by the cross-view network.
pub const EMBEDDING_DIM: usize = 256;

/// An ordered batch of embedding vectors, one row per sample.
///
/// Row order is meaningful: row `i` of an anchor batch lines up with row `i`
/// of its positive and negative batches, and row `i` of a query batch is
/// matched by row `i` of the gallery batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingBatch {
    data: Array2<f32>,
}

impl EmbeddingBatch {
    /// Wrap an existing `rows x dim` array.
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build a batch from a row-major flat buffer.
    pub fn from_flat(rows: usize, dim: usize, values: Vec<f32>) -> Result<Self, DistanceError> {
        let data = Array2::from_shape_vec((rows, dim), values)
            .map_err(|e| DistanceError::Shape(e.to_string()))?;
        Ok(Self { data })
    }

    /// Build a batch from individual vectors; every vector must share one length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, DistanceError> {
        let Some(first) = rows.first() else {
            return Err(DistanceError::Shape(
                "cannot infer dimension from zero rows".into(),
            ));
        };
        let dim = first.len();
        let n = rows.len();
        let mut flat = Vec::with_capacity(n * dim);
        for row in rows {
            if row.len() != dim {
                return Err(DistanceError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
            flat.extend(row);
        }
        Self::from_flat(n, dim, flat)
    }

    /// Stack batches vertically, preserving their order.
    ///
    /// Used to assemble the global descriptor set from per-step embeddings.
    pub fn concat(parts: &[EmbeddingBatch]) -> Result<Self, DistanceError> {
        let Some(first) = parts.first() else {
            return Err(DistanceError::Shape("no batches to concatenate".into()));
        };
        let dim = first.dim();
        if let Some(bad) = parts.iter().find(|p| p.dim() != dim) {
            return Err(DistanceError::DimensionMismatch {
                expected: dim,
                got: bad.dim(),
            });
        }
        let views: Vec<ArrayView2<'_, f32>> = parts.iter().map(|p| p.data.view()).collect();
        let data =
            concatenate(Axis(0), &views).map_err(|e| DistanceError::Shape(e.to_string()))?;
        Ok(Self { data })
    }

    /// Gather rows by index into a new batch (`out[i] = self[indices[i]]`).
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, DistanceError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(DistanceError::Shape(format!(
                "row index {bad} out of range for batch of {}",
                self.len()
            )));
        }
        Ok(Self {
            data: self.data.select(Axis(0), indices),
        })
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Embedding dimension (number of columns).
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.data.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }
}

/// An `N x M` matrix of squared distances between a query and a gallery batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Array2<f32>,
}

impl DistanceMatrix {
    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build a matrix from literal rows, e.g. an externally computed score table.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, DistanceError> {
        let n = rows.len();
        let m = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(n * m);
        for row in rows {
            if row.len() != m {
                return Err(DistanceError::Shape(format!(
                    "ragged matrix: expected {m} columns, got {}",
                    row.len()
                )));
            }
            flat.extend(row);
        }
        let data = Array2::from_shape_vec((n, m), flat)
            .map_err(|e| DistanceError::Shape(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_square(&self) -> bool {
        self.data.nrows() == self.data.ncols()
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[[i, j]]
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.data.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }
}
