//! # xview Recall
//!
//! Recall@K over a square query-to-gallery distance matrix, where query `i`
//! is matched by gallery item `i`. Recall is reported at `k = 1, 5, 10` and
//! at 1%, 5% and 10% of the gallery size.
//!
//! ```
//! use distance::DistanceMatrix;
//! use recall::RecallEvaluator;
//!
//! let d = DistanceMatrix::from_rows(vec![
//!     vec![0.1, 0.9],
//!     vec![0.2, 0.8],
//! ])
//! .unwrap();
//! let report = RecallEvaluator::default().evaluate(&d).unwrap();
//! assert_eq!(report.top_1(), 50.0);
//! ```

mod error;
mod evaluator;
mod report;
mod thresholds;

pub use crate::error::RecallError;
pub use crate::evaluator::{RankOrder, RecallEvaluator};
pub use crate::report::RecallReport;
pub use crate::thresholds::{RecallThresholds, THRESHOLD_LABELS};
