//! Training configuration.
//!
//! `TrainConfig` holds everything the epoch scheduler needs besides the data. It can be
//! built in code, or loaded from a JSON file where any omitted field keeps its default:
//!
//! ```json
//! {
//!   "epochs": 140,
//!   "batch_size": 25,
//!   "learning_rate": 0.001,
//!   "shuffle": { "seeded": 7 },
//!   "on_non_finite": "skip_batch",
//!   "backpressure": "latest_only"
//! }
//! ```

use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where the per-epoch shuffle draws its randomness from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shuffle {
    /// Reproducible permutations.
    Seeded(u64),
    /// Seeded from the OS on every `fit` call.
    Entropy,
}

impl Default for Shuffle {
    fn default() -> Self {
        Shuffle::Seeded(0)
    }
}

impl Shuffle {
    pub fn rng(self) -> StdRng {
        match self {
            Shuffle::Seeded(seed) => StdRng::seed_from_u64(seed),
            Shuffle::Entropy => StdRng::from_entropy(),
        }
    }
}

/// What to do with a batch that produced a non-finite activation, error term or gradient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Log it and leave the parameters untouched for that batch.
    #[default]
    SkipBatch,
    /// Stop training with `Error::NumericInstability`.
    Abort,
}

/// How the background trainer hands snapshots to a slower observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Replace an unconsumed snapshot with the newer one.
    #[default]
    LatestOnly,
    /// Wait at the epoch boundary until the observer has taken the previous snapshot.
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Full passes over the dataset. `0` trains nothing and emits nothing.
    pub epochs: usize,
    /// Samples per mini-batch; the last batch of an epoch may be shorter.
    pub batch_size: usize,
    pub learning_rate: f32,
    pub shuffle: Shuffle,
    pub on_non_finite: NonFinitePolicy,
    pub backpressure: Backpressure,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 140,
            batch_size: 25,
            learning_rate: 1e-3,
            shuffle: Shuffle::default(),
            on_non_finite: NonFinitePolicy::default(),
            backpressure: Backpressure::default(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be finite and >= 0, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
