use std::path::Path;

use xview::{
    BackendError, BatchSide, ConfigLoadError, DistanceError, DistanceMatrix, EmbeddingBatch,
    Evaluator, HardTripletMiner, MiningError, RecallError, RecallEvaluator, SiameseNetwork,
    StubSiamese, SyntheticDataset, TrainError, Trainer, TripletBatch, TripletDataset, TripletStep,
    XviewConfig, pairwise_linalg, triplet_loss,
};

fn batch(rows: Vec<Vec<f32>>) -> EmbeddingBatch {
    EmbeddingBatch::from_rows(rows).expect("valid rows")
}

#[test]
fn dimension_mismatch_is_reported_with_both_widths() {
    let x = batch(vec![vec![0.0; 4]]);
    let y = batch(vec![vec![0.0; 3]]);
    assert_eq!(
        pairwise_linalg(&x, &y),
        Err(DistanceError::DimensionMismatch {
            expected: 4,
            got: 3
        })
    );
}

#[test]
fn empty_gallery_is_rejected() {
    let x = batch(vec![vec![0.0; 4]]);
    let empty = EmbeddingBatch::from_flat(0, 4, Vec::new()).unwrap();
    assert_eq!(
        pairwise_linalg(&x, &empty),
        Err(DistanceError::EmptyBatch {
            side: BatchSide::Gallery
        })
    );
    assert_eq!(
        pairwise_linalg(&empty, &x),
        Err(DistanceError::EmptyBatch {
            side: BatchSide::Query
        })
    );
}

#[test]
fn mining_rejects_misaligned_batches() {
    let anchor = batch(vec![vec![0.0], vec![1.0], vec![2.0]]);
    let negative = batch(vec![vec![0.0], vec![1.0]]);
    let err = HardTripletMiner::default()
        .mine(&anchor, &anchor, &negative)
        .unwrap_err();
    assert!(matches!(
        err,
        MiningError::Misaligned {
            anchor: 3,
            negative: 2,
            ..
        }
    ));
}

#[test]
fn negative_margin_is_rejected() {
    let a = batch(vec![vec![0.0]]);
    assert_eq!(
        triplet_loss(&a, &a, &a, -0.5),
        Err(MiningError::InvalidMargin(-0.5))
    );
}

#[test]
fn recall_rejects_rectangular_matrix() {
    let d = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0]])
        .unwrap();
    assert_eq!(
        RecallEvaluator::new().evaluate(&d),
        Err(RecallError::NotSquare { rows: 3, cols: 2 })
    );
}

#[test]
fn missing_config_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = XviewConfig::from_file(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigLoadError::FileRead(_))));
}

/// Network whose aerial branch fails after a fixed number of calls.
struct FlakyNetwork {
    inner: StubSiamese,
    aerial_budget: std::cell::Cell<usize>,
}

impl SiameseNetwork for FlakyNetwork {
    type Input = String;

    fn embed_ground(&self, inputs: &[String]) -> Result<EmbeddingBatch, BackendError> {
        self.inner.embed_ground(inputs)
    }

    fn embed_aerial(&self, inputs: &[String]) -> Result<EmbeddingBatch, BackendError> {
        let left = self.aerial_budget.get();
        if left == 0 {
            return Err(BackendError::Model("aerial branch unavailable".into()));
        }
        self.aerial_budget.set(left - 1);
        self.inner.embed_aerial(inputs)
    }

    fn apply_gradients(&mut self, step: &TripletStep) -> Result<(), BackendError> {
        self.inner.apply_gradients(step)
    }

    fn save_weights(&self, path: &Path) -> Result<(), BackendError> {
        self.inner.save_weights(path)
    }

    fn load_weights(&mut self, path: &Path) -> Result<(), BackendError> {
        self.inner.load_weights(path)
    }
}

#[test]
fn model_failure_stops_training_before_the_update() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(dir.path().join("w.json"), dir.path().join("l.tsv")).with_epochs(1);
    // Enough for the first step (positive + negative), not the second.
    let mut net = FlakyNetwork {
        inner: StubSiamese::new(),
        aerial_budget: std::cell::Cell::new(3),
    };
    let err = trainer
        .fit(&mut net, &SyntheticDataset::new(8, 4), None)
        .unwrap_err();

    assert!(matches!(err, TrainError::Backend(BackendError::Model(_))));
    assert_eq!(net.inner.steps_applied(), 1);
    assert!(!dir.path().join("w.json").exists());
    assert!(!dir.path().join("l.tsv").exists());
}

struct FailingDataset;

impl TripletDataset for FailingDataset {
    type Input = String;

    fn steps(&self) -> usize {
        1
    }

    fn batches(&self) -> impl Iterator<Item = Result<TripletBatch<String>, BackendError>> + '_ {
        std::iter::once(Err(BackendError::Dataset("corrupt shard".into())))
    }
}

#[test]
fn dataset_failure_propagates_from_evaluation() {
    let err = Evaluator::default()
        .evaluate(&StubSiamese::new(), &FailingDataset)
        .unwrap_err();
    assert!(err.to_string().contains("corrupt shard"));
}
