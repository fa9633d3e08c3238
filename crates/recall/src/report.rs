use std::fmt;

use serde::Serialize;

use crate::thresholds::{RecallThresholds, THRESHOLD_LABELS};

/// Recall percentages (0 to 100) at the six standard cut-offs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecallReport {
    pub values: [f64; 6],
    pub thresholds: RecallThresholds,
    /// Number of queries the report was computed over.
    pub queries: usize,
}

impl RecallReport {
    pub fn top_1(&self) -> f64 {
        self.values[0]
    }

    pub fn top_5(&self) -> f64 {
        self.values[1]
    }

    pub fn top_10(&self) -> f64 {
        self.values[2]
    }

    pub fn top_1_percent(&self) -> f64 {
        self.values[3]
    }

    pub fn top_5_percent(&self) -> f64 {
        self.values[4]
    }

    pub fn top_10_percent(&self) -> f64 {
        self.values[5]
    }

    pub fn as_array(&self) -> [f64; 6] {
        self.values
    }

    /// `(label, k, recall)` for each cut-off in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize, f64)> + '_ {
        THRESHOLD_LABELS
            .iter()
            .zip(self.thresholds.iter())
            .zip(self.values.iter())
            .map(|((label, k), value)| (*label, k, *value))
    }
}

impl fmt::Display for RecallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, _, value) in self.iter() {
            writeln!(f, "top {label:>3}: {value:.2}")?;
        }
        Ok(())
    }
}
