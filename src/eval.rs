//! Gallery-wide recall@K evaluation.

use std::path::Path;
use std::time::Instant;

use distance::{EmbeddingBatch, pairwise_linalg};
use recall::{RecallEvaluator, RecallReport};

use crate::config::XviewConfig;
use crate::error::TrainError;
use crate::metrics::MetricsSpan;
use crate::network::{SiameseNetwork, TripletDataset};

/// Embeds every ground photo and its matching aerial image, then ranks the
/// full ground-by-aerial distance matrix.
///
/// Negatives in the dataset are ignored. Row `i` of the ground descriptors is
/// matched by row `i` of the aerial descriptors. Smaller distances rank first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    recall: RecallEvaluator,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank gallery rows on the rayon pool.
    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.recall = self.recall.with_parallel(use_parallel);
        self
    }

    pub fn from_config(cfg: &XviewConfig) -> Self {
        Self {
            recall: cfg.recall.evaluator(),
        }
    }

    pub fn evaluate<N, D>(&self, net: &N, data: &D) -> Result<RecallReport, TrainError>
    where
        N: SiameseNetwork,
        D: TripletDataset<Input = N::Input>,
    {
        let span = MetricsSpan::start();
        let result = self.run(net, data);
        if let Some(span) = span {
            span.record_evaluation(result.as_ref());
        }
        result
    }

    /// Load `weights` into `net`, then evaluate it.
    pub fn evaluate_checkpoint<N, D>(
        &self,
        net: &mut N,
        weights: &Path,
        data: &D,
    ) -> Result<RecallReport, TrainError>
    where
        N: SiameseNetwork,
        D: TripletDataset<Input = N::Input>,
    {
        net.load_weights(weights)
            .map_err(|source| TrainError::Restore {
                path: weights.to_path_buf(),
                source,
            })?;
        tracing::info!(weights = %weights.display(), "evaluating checkpoint");
        self.evaluate(net, data)
    }

    fn run<N, D>(&self, net: &N, data: &D) -> Result<RecallReport, TrainError>
    where
        N: SiameseNetwork,
        D: TripletDataset<Input = N::Input>,
    {
        let started = Instant::now();
        let mut ground = Vec::with_capacity(data.steps());
        let mut aerial = Vec::with_capacity(data.steps());
        for batch in data.batches() {
            let batch = batch?;
            ground.push(net.embed_ground(&batch.ground)?);
            aerial.push(net.embed_aerial(&batch.positive)?);
        }
        if ground.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let ground = EmbeddingBatch::concat(&ground)?;
        let aerial = EmbeddingBatch::concat(&aerial)?;
        let distances = pairwise_linalg(&ground, &aerial)?;
        let report = self.recall.evaluate(&distances)?;

        tracing::info!(
            queries = report.queries,
            top_1 = report.top_1(),
            top_1_percent = report.top_1_percent(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "evaluation finished"
        );
        Ok(report)
    }
}
