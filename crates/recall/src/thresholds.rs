use serde::{Deserialize, Serialize};

/// Labels for the six reported cut-offs, in report order.
pub const THRESHOLD_LABELS: [&str; 6] = ["1", "5", "10", "1%", "5%", "10%"];

/// The six `k` values recall is reported at for a gallery of `n` items:
/// `1, 5, 10` and `1%, 5%, 10%` of `n` rounded up, all clamped to `[1, n]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallThresholds {
    ks: [usize; 6],
}

impl RecallThresholds {
    pub fn for_gallery(n: usize) -> Self {
        let max = n.max(1);
        let raw = [1, 5, 10, percent_ceil(n, 1), percent_ceil(n, 5), percent_ceil(n, 10)];
        Self {
            ks: raw.map(|k| k.clamp(1, max)),
        }
    }

    pub fn as_array(&self) -> [usize; 6] {
        self.ks
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ks.iter().copied()
    }
}

fn percent_ceil(n: usize, percent: usize) -> usize {
    (n * percent).div_ceil(100)
}
