use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use recall::RecallReport;

use crate::error::TrainError;

/// Metrics observer for training steps, epochs and evaluations.
pub trait TrainingMetrics: Send + Sync {
    /// `result` carries the batch mean loss on success.
    fn record_step(&self, latency: Duration, result: Result<f32, &TrainError>);
    fn record_epoch(&self, epoch: usize, mean_loss: f64, elapsed: Duration);
    fn record_evaluation(&self, latency: Duration, result: Result<&RecallReport, &TrainError>);
}

/// Install or clear the global training metrics recorder.
pub fn set_training_metrics(recorder: Option<Arc<dyn TrainingMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn TrainingMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn TrainingMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn TrainingMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn TrainingMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_step(self, result: Result<f32, &TrainError>) {
        self.recorder.record_step(self.start.elapsed(), result);
    }

    pub(crate) fn record_evaluation(self, result: Result<&RecallReport, &TrainError>) {
        self.recorder
            .record_evaluation(self.start.elapsed(), result);
    }
}

pub(crate) fn record_epoch(epoch: usize, mean_loss: f64, elapsed: Duration) {
    if let Some(recorder) = metrics_recorder() {
        recorder.record_epoch(epoch, mean_loss, elapsed);
    }
}
