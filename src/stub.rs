//! Deterministic stand-ins for the embedding network and the image dataset.
//!
//! [`StubSiamese`] hashes each input key into a fixed sinusoid vector, so the
//! same key always embeds to the same point and the ground and aerial branches
//! agree unless jitter is added to the aerial side. [`SyntheticDataset`] pairs
//! `"{prefix}-{i}"` keys into triplets. Together they drive the demo binary
//! and the tests without a learning framework.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use distance::{EMBEDDING_DIM, EmbeddingBatch};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::BackendError;
use crate::network::{SiameseNetwork, TripletBatch, TripletDataset, TripletStep};

const BASE_SEED: u64 = 0x5EED_0F_C0DE;
const AERIAL_NOISE_SEED: u64 = 0xAE41_A100_0000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubSiamese {
    dim: usize,
    jitter: f32,
    steps_applied: usize,
    last_loss: Option<f32>,
}

impl Default for StubSiamese {
    fn default() -> Self {
        Self {
            dim: EMBEDDING_DIM,
            jitter: 0.0,
            steps_applied: 0,
            last_loss: None,
        }
    }
}

impl StubSiamese {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    /// Scale of the key-seeded noise added to aerial embeddings before
    /// normalization. Zero keeps both branches identical.
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn steps_applied(&self) -> usize {
        self.steps_applied
    }

    pub fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    /// Read a network saved with [`SiameseNetwork::save_weights`].
    pub fn from_weights_file(path: &Path) -> Result<Self, BackendError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn embed(&self, inputs: &[String], aerial: bool) -> Result<EmbeddingBatch, BackendError> {
        let mut flat = Vec::with_capacity(inputs.len() * self.dim);
        for input in inputs {
            let start = flat.len();
            let bytes = input.as_bytes();
            flat.extend((0..self.dim).map(|idx| sinusoid(bytes, BASE_SEED, idx)));
            let v = &mut flat[start..];
            if aerial && self.jitter != 0.0 {
                for (idx, value) in v.iter_mut().enumerate() {
                    *value += self.jitter * sinusoid(bytes, AERIAL_NOISE_SEED, idx);
                }
            }
            l2_normalize_in_place(v);
        }
        EmbeddingBatch::from_flat(inputs.len(), self.dim, flat)
            .map_err(|e| BackendError::Model(e.to_string()))
    }
}

impl SiameseNetwork for StubSiamese {
    type Input = String;

    fn embed_ground(&self, inputs: &[String]) -> Result<EmbeddingBatch, BackendError> {
        self.embed(inputs, false)
    }

    fn embed_aerial(&self, inputs: &[String]) -> Result<EmbeddingBatch, BackendError> {
        self.embed(inputs, true)
    }

    fn apply_gradients(&mut self, step: &TripletStep) -> Result<(), BackendError> {
        self.steps_applied += 1;
        self.last_loss = Some(step.loss.mean);
        tracing::trace!(steps = self.steps_applied, loss = step.loss.mean, "stub update");
        Ok(())
    }

    fn save_weights(&self, path: &Path) -> Result<(), BackendError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    fn load_weights(&mut self, path: &Path) -> Result<(), BackendError> {
        *self = Self::from_weights_file(path)?;
        Ok(())
    }
}

fn sinusoid(bytes: &[u8], seed: u64, idx: usize) -> f32 {
    let h = xxh3_64_with_seed(bytes, seed.wrapping_add(idx as u64));
    ((h >> 40) as f32 * 1e-3).sin()
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// `locations` keyed triplets in fixed-size batches. The negative for
/// location `i` is location `i + locations / 2` (wrapping), so naive pairs
/// never match.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    locations: usize,
    batch_size: usize,
    prefix: String,
}

impl SyntheticDataset {
    pub fn new(locations: usize, batch_size: usize) -> Self {
        Self {
            locations,
            batch_size: batch_size.max(1),
            prefix: "loc".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn len(&self) -> usize {
        self.locations
    }

    pub fn is_empty(&self) -> bool {
        self.locations == 0
    }

    fn key(&self, i: usize) -> String {
        format!("{}-{i}", self.prefix)
    }

    fn batch(&self, step: usize) -> TripletBatch<String> {
        let start = step * self.batch_size;
        let end = (start + self.batch_size).min(self.locations);
        let offset = (self.locations / 2).max(1);
        let keys: Vec<String> = (start..end).map(|i| self.key(i)).collect();
        TripletBatch {
            ground: keys.clone(),
            positive: keys,
            negative: (start..end)
                .map(|i| self.key((i + offset) % self.locations))
                .collect(),
        }
    }
}

impl TripletDataset for SyntheticDataset {
    type Input = String;

    fn steps(&self) -> usize {
        self.locations.div_ceil(self.batch_size)
    }

    fn batches(&self) -> impl Iterator<Item = Result<TripletBatch<String>, BackendError>> + '_ {
        (0..self.steps()).map(move |step| Ok(self.batch(step)))
    }
}
