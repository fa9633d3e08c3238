//! Epoch-based triplet training with batch-local hard-negative mining.
//!
//! Each step embeds the anchor, positive and negative images, swaps in the
//! hardest in-batch negatives, scores the triplet loss and hands the result
//! to the network for one optimizer update. After every epoch the weights are
//! saved and the per-step losses appended to the loss log.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use mining::{DEFAULT_MARGIN, HardTripletMiner, MinedNegatives, triplet_loss};
use recall::RecallReport;
use serde::Serialize;

use crate::config::XviewConfig;
use crate::error::TrainError;
use crate::eval::Evaluator;
use crate::loss_log::LossLog;
use crate::metrics::{self, MetricsSpan};
use crate::network::{SiameseNetwork, TripletBatch, TripletDataset, TripletStep};
use crate::progress::Progress;

/// Outcome of one pass over the training set.
#[derive(Debug, Clone, Serialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub steps: usize,
    pub mean_loss: f64,
    /// Per-step batch mean losses, in step order.
    pub losses: Vec<f32>,
    pub elapsed: Duration,
    pub recall: Option<RecallReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainSummary {
    pub epochs: Vec<EpochSummary>,
}

impl TrainSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.mean_loss)
    }
}

#[derive(Debug, Clone)]
pub struct Trainer {
    miner: HardTripletMiner,
    mine_hard_negatives: bool,
    margin: f32,
    epochs: usize,
    weights_path: PathBuf,
    loss_log: LossLog,
    evaluate_each_epoch: bool,
    evaluator: Evaluator,
    resume: bool,
}

impl Trainer {
    pub fn new(weights_path: impl Into<PathBuf>, loss_log_path: impl Into<PathBuf>) -> Self {
        Self {
            miner: HardTripletMiner::default(),
            mine_hard_negatives: true,
            margin: DEFAULT_MARGIN,
            epochs: 10,
            weights_path: weights_path.into(),
            loss_log: LossLog::new(loss_log_path),
            evaluate_each_epoch: false,
            evaluator: Evaluator::default(),
            resume: false,
        }
    }

    pub fn from_config(cfg: &XviewConfig) -> Self {
        Self {
            miner: HardTripletMiner::new(cfg.distance.engine()),
            mine_hard_negatives: cfg.mining.enabled,
            margin: cfg.mining.margin,
            epochs: cfg.training.epochs,
            weights_path: cfg.training.weights_path.clone(),
            loss_log: LossLog::new(cfg.training.loss_log_path.clone()),
            evaluate_each_epoch: cfg.training.evaluate_each_epoch,
            evaluator: Evaluator::from_config(cfg),
            resume: cfg.training.resume,
        }
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_mining(mut self, enabled: bool) -> Self {
        self.mine_hard_negatives = enabled;
        self
    }

    pub fn with_miner(mut self, miner: HardTripletMiner) -> Self {
        self.miner = miner;
        self
    }

    pub fn with_evaluation(mut self, evaluator: Evaluator, each_epoch: bool) -> Self {
        self.evaluator = evaluator;
        self.evaluate_each_epoch = each_epoch;
        self
    }

    /// Start from the checkpoint at the weights path when one exists.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    pub fn loss_log(&self) -> &LossLog {
        &self.loss_log
    }

    /// Run every epoch. When per-epoch evaluation is on and `validation` is
    /// given, each epoch summary carries its recall report.
    pub fn fit<N, D>(
        &self,
        net: &mut N,
        train: &D,
        validation: Option<&D>,
    ) -> Result<TrainSummary, TrainError>
    where
        N: SiameseNetwork,
        D: TripletDataset<Input = N::Input>,
    {
        if self.resume {
            self.restore(net)?;
        }

        let mut summary = TrainSummary::default();
        for epoch in 0..self.epochs {
            let mut epoch_summary = self.train_epoch(net, train, epoch)?;
            if self.evaluate_each_epoch {
                if let Some(data) = validation {
                    epoch_summary.recall = Some(self.evaluator.evaluate(net, data)?);
                }
            }
            summary.epochs.push(epoch_summary);
        }
        Ok(summary)
    }

    fn restore<N: SiameseNetwork>(&self, net: &mut N) -> Result<(), TrainError> {
        if !self.weights_path.exists() {
            tracing::info!(
                weights = %self.weights_path.display(),
                "no checkpoint found, starting from initial weights"
            );
            return Ok(());
        }
        net.load_weights(&self.weights_path)
            .map_err(|source| TrainError::Restore {
                path: self.weights_path.clone(),
                source,
            })?;
        tracing::info!(weights = %self.weights_path.display(), "resumed from checkpoint");
        Ok(())
    }

    pub fn train_epoch<N, D>(
        &self,
        net: &mut N,
        data: &D,
        epoch: usize,
    ) -> Result<EpochSummary, TrainError>
    where
        N: SiameseNetwork,
        D: TripletDataset<Input = N::Input>,
    {
        let mut progress = Progress::new(epoch, data.steps());
        let mut losses = Vec::with_capacity(data.steps());

        for batch in data.batches() {
            let batch = batch?;
            let span = MetricsSpan::start();
            let started = Instant::now();
            let step = match self.train_step(net, &batch) {
                Ok(step) => {
                    if let Some(span) = span {
                        span.record_step(Ok(step.loss.mean));
                    }
                    step
                }
                Err(err) => {
                    if let Some(span) = span {
                        span.record_step(Err(&err));
                    }
                    return Err(err);
                }
            };
            losses.push(step.loss.mean);
            progress.advance(step.loss.mean, started.elapsed());
            tracing::debug!(target: "xview::progress", "{progress}");
        }

        if losses.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        net.save_weights(&self.weights_path)
            .map_err(|source| TrainError::Persist {
                path: self.weights_path.clone(),
                source,
            })?;
        self.loss_log
            .append(epoch, &losses)
            .map_err(|source| TrainError::LossLog {
                path: self.loss_log.path().to_path_buf(),
                source,
            })?;

        let summary = EpochSummary {
            epoch,
            steps: progress.steps(),
            mean_loss: progress.mean_loss(),
            losses,
            elapsed: progress.elapsed(),
            recall: None,
        };
        tracing::info!(
            epoch,
            steps = summary.steps,
            mean_loss = summary.mean_loss,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            weights = %self.weights_path.display(),
            "epoch finished"
        );
        metrics::record_epoch(epoch, summary.mean_loss, summary.elapsed);
        Ok(summary)
    }

    /// Embed, mine, score and apply one batch.
    pub fn train_step<N>(
        &self,
        net: &mut N,
        batch: &TripletBatch<N::Input>,
    ) -> Result<TripletStep, TrainError>
    where
        N: SiameseNetwork,
    {
        let anchor = net.embed_ground(&batch.ground)?;
        let positive = net.embed_aerial(&batch.positive)?;
        let negative = net.embed_aerial(&batch.negative)?;

        let (negative, mined_indices) = if self.mine_hard_negatives {
            let MinedNegatives { indices, negatives } =
                self.miner.mine_indices(&anchor, &negative)?;
            (negatives, Some(indices))
        } else {
            (negative, None)
        };

        let loss = triplet_loss(&anchor, &positive, &negative, self.margin)?;
        let step = TripletStep {
            anchor,
            positive,
            negative,
            mined_indices,
            loss,
        };
        net.apply_gradients(&step)?;
        Ok(step)
    }
}
