//! A from-scratch dew-point regressor.
//!
//! `dewpoint-mlp` trains a fixed 3 -> 3 -> 2 -> 1 ReLU network with shuffled mini-batch
//! gradient descent. Inputs are a normalized (temperature, relative humidity, pressure)
//! reading; the output is a normalized dew point.
//!
//! # Design goals
//!
//! - Readable math: one forward pass, one backward pass, explicit error terms.
//! - Allocation-free hot path: `Scratch`, `Deltas` and `Gradients` are allocated once per run.
//! - Observable training: a `Snapshot` of all parameters and metrics is emitted after every
//!   epoch, either to a caller-supplied `SnapshotSink` or to an `Observer` on its own thread.
//!
//! # Panics vs `Result`
//!
//! - Low-level hot path (panics on misuse):
//!   - [`Network::forward`], [`Network::backward`], [`Network::apply_update`]
//!   - [`Gradients::accumulate`]
//!     Shape mismatches are programmer error and panic via `assert!`.
//!
//! - High-level APIs (checked):
//!   - [`Network::fit`], [`spawn_training`], [`Network::predict`], [`Network::evaluate_mse`]
//!   - [`Network::from_parameters`], [`SavedModel::load_json`], [`TrainConfig::from_json_file`]
//!     These validate inputs and return [`Result`].
//!
//! # Data layout
//!
//! - Scalars are `f32`; epoch MSE is accumulated in `f64`.
//! - [`Dataset`] stores inputs contiguously, row-major, `INPUT_SIZE` per sample.
//! - Layer weights are row-major with shape `(out_dim, in_dim)`.
//!
//! # Quick start
//!
//! ```rust
//! use dewpoint_mlp::{dewpoint, CancelToken, Network, Snapshot, TrainConfig};
//!
//! # fn main() -> dewpoint_mlp::Result<()> {
//! let corpus = dewpoint::generate_with_seed(200, 0)?;
//! let mut net = Network::new_with_seed(0);
//!
//! let cfg = TrainConfig {
//!     epochs: 3,
//!     ..TrainConfig::default()
//! };
//! let mut snapshots: Vec<Snapshot> = Vec::new();
//! let report = net.fit(&corpus.dataset, &cfg, &mut snapshots, &CancelToken::new())?;
//!
//! assert_eq!(snapshots.len(), 3);
//! assert_eq!(report.epochs_completed, 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Background training
//!
//! ```rust
//! use dewpoint_mlp::{dewpoint, spawn_training, Network, Observer, ObserverError, Snapshot, TrainConfig};
//!
//! struct Print;
//!
//! impl Observer for Print {
//!     fn on_snapshot(&mut self, s: &Snapshot) -> Result<(), ObserverError> {
//!         println!("epoch {} mse {}", s.epoch, s.mse);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> dewpoint_mlp::Result<()> {
//! let corpus = dewpoint::generate_with_seed(100, 1)?;
//! let cfg = TrainConfig { epochs: 2, ..TrainConfig::default() };
//! let handle = spawn_training(Network::new_with_seed(1), corpus.dataset, cfg, Print)?;
//! let (_net, report) = handle.join()?;
//! assert_eq!(report.epochs_completed, 2);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod background;
pub mod config;
pub mod data;
pub mod dewpoint;
pub mod error;
pub mod gradients;
pub mod layer;
pub mod metrics;
pub mod network;
pub mod schedule;
pub mod serde_model;
pub mod snapshot;
pub mod train;

pub use background::{spawn_training, Observer, ObserverError, TrainingHandle};
pub use config::{Backpressure, NonFinitePolicy, Shuffle, TrainConfig};
pub use data::{Dataset, Sample};
pub use dewpoint::{Corpus, TargetRange};
pub use error::{Error, Instability, Result};
pub use gradients::{Gradients, LayerGradients};
pub use layer::Layer;
pub use metrics::EpochMetrics;
pub use network::{Deltas, Network, Scratch, HIDDEN1_SIZE, HIDDEN2_SIZE, INPUT_SIZE, OUTPUT_SIZE};
pub use serde_model::{SavedModel, MODEL_FORMAT_VERSION};
pub use snapshot::{Discard, LayerParameters, Parameters, Snapshot, SnapshotSink};
pub use train::{CancelToken, FitReport, Trainer, TrainingState};
