//! Pairwise squared Euclidean distance between two embedding batches.
//!
//! Three interchangeable forms are provided:
//!
//! - [`pairwise_loop`]: per-pair subtraction, the reference oracle.
//! - [`pairwise_broadcast`]: element-wise broadcasting over an `N x M x D`
//!   temporary. Fine for training batches, too memory hungry for galleries.
//! - [`pairwise_linalg`]: `||x||² + ||y||² - 2·x·yᵀ` through one matrix
//!   multiply. This is the form the evaluation path uses.
//!
//! All three agree within floating point accumulation error.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::batch::{DistanceMatrix, EmbeddingBatch};
use crate::error::{BatchSide, DistanceError};

/// Above this many `n * m * d` elements `Auto` switches from broadcasting
/// to the matrix-multiply form.
pub const DEFAULT_BROADCAST_MAX_ELEMENTS: usize = 1 << 20;

/// Selects how [`DistanceEngine::pairwise`] computes the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    Loop,
    Broadcast,
    LinearAlgebra,
    /// Broadcast for small inputs, linear algebra otherwise.
    #[default]
    Auto,
}

/// Configurable front end over the three distance forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceEngine {
    pub method: DistanceMethod,
    pub broadcast_max_elements: usize,
}

impl Default for DistanceEngine {
    fn default() -> Self {
        Self {
            method: DistanceMethod::Auto,
            broadcast_max_elements: DEFAULT_BROADCAST_MAX_ELEMENTS,
        }
    }
}

impl DistanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: DistanceMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_broadcast_max_elements(mut self, max: usize) -> Self {
        self.broadcast_max_elements = max;
        self
    }

    /// The concrete form used for an `n x m` matrix over `d` dimensions.
    pub fn resolve(&self, n: usize, m: usize, d: usize) -> DistanceMethod {
        match self.method {
            DistanceMethod::Auto => {
                let elements = n.saturating_mul(m).saturating_mul(d);
                if elements <= self.broadcast_max_elements {
                    DistanceMethod::Broadcast
                } else {
                    DistanceMethod::LinearAlgebra
                }
            }
            explicit => explicit,
        }
    }

    /// Compute `D[i, j] = ||x[i] - y[j]||²`.
    pub fn pairwise(
        &self,
        x: &EmbeddingBatch,
        y: &EmbeddingBatch,
    ) -> Result<DistanceMatrix, DistanceError> {
        validate_pair(x, y)?;
        let method = self.resolve(x.len(), y.len(), x.dim());
        tracing::debug!(
            ?method,
            rows = x.len(),
            cols = y.len(),
            dim = x.dim(),
            "computing pairwise distances"
        );
        let data = match method {
            DistanceMethod::Loop => loop_form(x, y),
            DistanceMethod::Broadcast => broadcast_form(x, y),
            DistanceMethod::LinearAlgebra | DistanceMethod::Auto => linalg_form(x, y),
        };
        Ok(DistanceMatrix::from_array(data))
    }
}

/// Reference implementation: one subtraction loop per pair.
pub fn pairwise_loop(
    x: &EmbeddingBatch,
    y: &EmbeddingBatch,
) -> Result<DistanceMatrix, DistanceError> {
    validate_pair(x, y)?;
    Ok(DistanceMatrix::from_array(loop_form(x, y)))
}

/// Broadcast `(n, 1, d) - (1, m, d)`, square, and reduce over `d`.
pub fn pairwise_broadcast(
    x: &EmbeddingBatch,
    y: &EmbeddingBatch,
) -> Result<DistanceMatrix, DistanceError> {
    validate_pair(x, y)?;
    Ok(DistanceMatrix::from_array(broadcast_form(x, y)))
}

/// Expansion identity evaluated with a single matrix multiply.
pub fn pairwise_linalg(
    x: &EmbeddingBatch,
    y: &EmbeddingBatch,
) -> Result<DistanceMatrix, DistanceError> {
    validate_pair(x, y)?;
    Ok(DistanceMatrix::from_array(linalg_form(x, y)))
}

/// Row-aligned distances `||x[i] - y[i]||²`, as used for anchor/positive and
/// anchor/negative pairs.
pub fn paired_distances(
    x: &EmbeddingBatch,
    y: &EmbeddingBatch,
) -> Result<Vec<f32>, DistanceError> {
    validate_pair(x, y)?;
    if x.len() != y.len() {
        return Err(DistanceError::Shape(format!(
            "paired distances need equal row counts, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    Ok(x.view()
        .outer_iter()
        .zip(y.view().outer_iter())
        .map(|(a, b)| {
            a.iter()
                .zip(b.iter())
                .map(|(p, q)| {
                    let d = p - q;
                    d * d
                })
                .sum()
        })
        .collect())
}

fn validate_pair(x: &EmbeddingBatch, y: &EmbeddingBatch) -> Result<(), DistanceError> {
    if x.is_empty() {
        return Err(DistanceError::EmptyBatch {
            side: BatchSide::Query,
        });
    }
    if y.is_empty() {
        return Err(DistanceError::EmptyBatch {
            side: BatchSide::Gallery,
        });
    }
    if x.dim() != y.dim() {
        return Err(DistanceError::DimensionMismatch {
            expected: x.dim(),
            got: y.dim(),
        });
    }
    Ok(())
}

fn loop_form(x: &EmbeddingBatch, y: &EmbeddingBatch) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros((x.len(), y.len()));
    for i in 0..x.len() {
        let xi = x.row(i);
        for j in 0..y.len() {
            let mut acc = 0.0f32;
            for (a, b) in xi.iter().zip(y.row(j).iter()) {
                let d = a - b;
                acc += d * d;
            }
            out[[i, j]] = acc;
        }
    }
    out
}

fn broadcast_form(x: &EmbeddingBatch, y: &EmbeddingBatch) -> Array2<f32> {
    let xs = x.view().insert_axis(Axis(1));
    let ys = y.view().insert_axis(Axis(0));
    let diff = &xs - &ys;
    diff.mapv(|v| v * v).sum_axis(Axis(2))
}

fn linalg_form(x: &EmbeddingBatch, y: &EmbeddingBatch) -> Array2<f32> {
    let xv = x.view();
    let yv = y.view();
    let x_sq = xv.map_axis(Axis(1), |row| row.dot(&row));
    let y_sq = yv.map_axis(Axis(1), |row| row.dot(&row));

    let mut out = xv.dot(&yv.t());
    out *= -2.0;
    out += &x_sq.insert_axis(Axis(1));
    out += &y_sq.insert_axis(Axis(0));
    // Cancellation can leave tiny negatives where x[i] == y[j].
    out.mapv_inplace(|v| v.max(0.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_batch(rng: &mut fastrand::Rng, rows: usize, dim: usize) -> EmbeddingBatch {
        let values: Vec<f32> = (0..rows * dim).map(|_| rng.f32()).collect();
        EmbeddingBatch::from_flat(rows, dim, values).unwrap()
    }

    fn assert_close(a: &DistanceMatrix, b: &DistanceMatrix) {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for (x, y) in a.view().iter().zip(b.view().iter()) {
            let tol = 1e-3 + 1e-3 * y.abs();
            assert!((x - y).abs() <= tol, "{x} vs {y}");
        }
    }

    #[test]
    fn known_distance() {
        let x = EmbeddingBatch::from_rows(vec![vec![0.0, 0.0]]).unwrap();
        let y = EmbeddingBatch::from_rows(vec![vec![3.0, 4.0], vec![0.0, 1.0]]).unwrap();
        for d in [
            pairwise_loop(&x, &y).unwrap(),
            pairwise_broadcast(&x, &y).unwrap(),
            pairwise_linalg(&x, &y).unwrap(),
        ] {
            assert!((d.get(0, 0) - 25.0).abs() < 1e-5);
            assert!((d.get(0, 1) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn three_forms_agree_on_rectangular_input() {
        let mut rng = fastrand::Rng::with_seed(7);
        let x = random_batch(&mut rng, 37, 64);
        let y = random_batch(&mut rng, 23, 64);

        let reference = pairwise_loop(&x, &y).unwrap();
        assert_close(&pairwise_broadcast(&x, &y).unwrap(), &reference);
        assert_close(&pairwise_linalg(&x, &y).unwrap(), &reference);
    }

    #[test]
    fn self_distance_is_symmetric_with_zero_diagonal() {
        let mut rng = fastrand::Rng::with_seed(11);
        let x = random_batch(&mut rng, 40, 256);
        let d = pairwise_linalg(&x, &x).unwrap();
        for i in 0..d.rows() {
            assert!(d.get(i, i).abs() < 1e-3);
            for j in 0..i {
                let tol = 1e-3 + 1e-3 * d.get(i, j).abs();
                assert!((d.get(i, j) - d.get(j, i)).abs() <= tol);
            }
        }
    }

    #[test]
    fn linalg_never_negative() {
        let x = EmbeddingBatch::from_rows(vec![vec![1e3, -1e3, 7.5]; 4]).unwrap();
        let d = pairwise_linalg(&x, &x).unwrap();
        assert!(d.view().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let x = EmbeddingBatch::from_rows(vec![vec![0.0; 4]]).unwrap();
        let y = EmbeddingBatch::from_rows(vec![vec![0.0; 3]]).unwrap();
        let err = DistanceEngine::default().pairwise(&x, &y).unwrap_err();
        assert_eq!(
            err,
            DistanceError::DimensionMismatch {
                expected: 4,
                got: 3
            }
        );
    }

    #[test]
    fn empty_batches_are_rejected() {
        let empty = EmbeddingBatch::from_array(Array2::zeros((0, 4)));
        let one = EmbeddingBatch::from_rows(vec![vec![0.0; 4]]).unwrap();
        assert!(matches!(
            pairwise_linalg(&empty, &one),
            Err(DistanceError::EmptyBatch {
                side: BatchSide::Query
            })
        ));
        assert!(matches!(
            pairwise_broadcast(&one, &empty),
            Err(DistanceError::EmptyBatch {
                side: BatchSide::Gallery
            })
        ));
    }

    #[test]
    fn auto_resolves_by_size() {
        let engine = DistanceEngine::default().with_broadcast_max_elements(1000);
        assert_eq!(engine.resolve(4, 4, 16), DistanceMethod::Broadcast);
        assert_eq!(engine.resolve(100, 100, 256), DistanceMethod::LinearAlgebra);

        let forced = engine.with_method(DistanceMethod::Loop);
        assert_eq!(forced.resolve(100, 100, 256), DistanceMethod::Loop);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let mut rng = fastrand::Rng::with_seed(3);
        let x = random_batch(&mut rng, 16, 32);
        let y = random_batch(&mut rng, 16, 32);
        let engine = DistanceEngine::default();
        assert_eq!(
            engine.pairwise(&x, &y).unwrap(),
            engine.pairwise(&x, &y).unwrap()
        );
    }

    #[test]
    fn paired_distances_are_row_aligned() {
        let a = EmbeddingBatch::from_rows(vec![vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        let b = EmbeddingBatch::from_rows(vec![vec![0.0, 2.0], vec![1.0, 1.0]]).unwrap();
        assert_eq!(paired_distances(&a, &b).unwrap(), vec![4.0, 0.0]);

        let short = EmbeddingBatch::from_rows(vec![vec![0.0, 0.0]]).unwrap();
        assert!(paired_distances(&a, &short).is_err());
    }
}
