//! Per-epoch training progress: running loss, step latency, ETA and a text bar.

use std::fmt;
use std::time::Duration;

pub const BAR_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    epoch: usize,
    total_steps: usize,
    steps: usize,
    loss_sum: f64,
    elapsed: Duration,
}

impl Progress {
    pub fn new(epoch: usize, total_steps: usize) -> Self {
        Self {
            epoch,
            total_steps,
            steps: 0,
            loss_sum: 0.0,
            elapsed: Duration::ZERO,
        }
    }

    /// Record one finished step.
    pub fn advance(&mut self, loss: f32, step_time: Duration) {
        self.steps += 1;
        self.loss_sum += f64::from(loss);
        self.elapsed += step_time;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Mean of the per-step batch losses so far.
    pub fn mean_loss(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.loss_sum / self.steps as f64
    }

    pub fn time_per_step(&self) -> Duration {
        if self.steps == 0 {
            return Duration::ZERO;
        }
        self.elapsed / self.steps as u32
    }

    /// Remaining time at the current mean step latency.
    pub fn eta(&self) -> Duration {
        let remaining = self.total_steps.saturating_sub(self.steps);
        self.time_per_step() * remaining as u32
    }

    /// Number of filled bar cells, one per two whole percent.
    pub fn filled(&self) -> usize {
        if self.total_steps == 0 {
            return 0;
        }
        let percent = (200 * self.steps + self.total_steps) / (2 * self.total_steps);
        (percent / 2).min(BAR_WIDTH)
    }

    pub fn bar(&self) -> String {
        let filled = self.filled();
        format!("{}>{}", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch:{}  {}/{} [{}] loss: {:.2}\t{}ms/step\tETA: {}",
            self.epoch,
            self.steps,
            self.total_steps,
            self.bar(),
            self.mean_loss(),
            self.time_per_step().as_millis(),
            format_hms(self.eta()),
        )
    }
}

fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_progress_is_empty() {
        let p = Progress::new(0, 10);
        assert_eq!(p.mean_loss(), 0.0);
        assert_eq!(p.eta(), Duration::ZERO);
        assert_eq!(p.bar(), format!(">{}", " ".repeat(BAR_WIDTH)));
    }

    #[test]
    fn tracks_mean_loss_and_eta() {
        let mut p = Progress::new(3, 10);
        p.advance(1.0, Duration::from_millis(100));
        p.advance(0.5, Duration::from_millis(100));

        assert!((p.mean_loss() - 0.75).abs() < 1e-9);
        assert_eq!(p.time_per_step(), Duration::from_millis(100));
        assert_eq!(p.eta(), Duration::from_millis(800));
        assert_eq!(p.filled(), 10);

        let line = p.to_string();
        assert!(line.starts_with("epoch:3  2/10 [=========="));
        assert!(line.contains("loss: 0.75"));
        assert!(line.contains("100ms/step"));
        assert!(line.ends_with("ETA: 0:00:00"));
    }

    #[test]
    fn bar_fills_at_completion() {
        let mut p = Progress::new(0, 3);
        for _ in 0..3 {
            p.advance(0.0, Duration::from_secs(1));
        }
        assert_eq!(p.filled(), BAR_WIDTH);
        assert_eq!(p.eta(), Duration::ZERO);
    }

    #[test]
    fn formats_long_eta() {
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 125)), "3:02:05");
    }
}
