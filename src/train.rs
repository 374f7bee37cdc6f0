//! The epoch scheduler.
//!
//! `Network::fit` runs the whole training loop on the calling thread:
//!
//! 1. reset the epoch metrics and reshuffle the sample order
//! 2. for each mini-batch: forward, backward and accumulate every sample, then one update
//! 3. compute the epoch MSE, copy the parameters into a `Snapshot`, emit it
//!
//! See `crate::background` for running it off-thread with an observer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::NonFinitePolicy;
use crate::error::Instability;
use crate::network::{Deltas, Scratch};
use crate::schedule::{batch_count, batches, shuffle_order};
use crate::snapshot::{Snapshot, SnapshotSink};
use crate::{Dataset, EpochMetrics, Error, Gradients, Network, Result, TrainConfig};

/// Where a training run is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrainingState {
    #[default]
    Idle,
    /// 1-based epoch currently being trained.
    Running { epoch: usize },
    Completed,
    /// Stopped at a batch boundary by a `CancelToken`.
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitReport {
    pub state: TrainingState,
    pub epochs_completed: usize,
    /// Batches started, including skipped ones.
    pub batches_run: usize,
    pub skipped_batches: usize,
    /// MSE of every completed epoch, in order.
    pub epoch_mse: Vec<f32>,
}

impl FitReport {
    pub fn final_mse(&self) -> Option<f32> {
        self.epoch_mse.last().copied()
    }
}

/// Cooperative cancellation flag, checked before every batch.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Reusable per-sample buffers for training a `Network`.
#[derive(Debug, Clone)]
pub struct Trainer {
    pub scratch: Scratch,
    pub deltas: Deltas,
    pub grads: Gradients,
}

impl Trainer {
    pub fn new(net: &Network) -> Self {
        Self {
            scratch: Scratch::default(),
            deltas: Deltas::default(),
            grads: Gradients::new(net),
        }
    }
}

impl Network {
    /// Convenience constructor: allocate all training buffers.
    #[inline]
    pub fn trainer(&self) -> Trainer {
        Trainer::new(self)
    }

    /// Train on `data` for `cfg.epochs` epochs of shuffled mini-batch SGD.
    ///
    /// After every completed epoch a `Snapshot` is built from the current parameters and
    /// passed to `sink` before the next epoch starts mutating them. `cancel` is polled
    /// before each batch; a cancelled run returns `Ok` with `TrainingState::Cancelled` and
    /// emits nothing for the interrupted epoch.
    ///
    /// Errors:
    /// - `InvalidConfig` for a bad config or an empty dataset
    /// - `NumericInstability` if a batch goes non-finite under `NonFinitePolicy::Abort`
    pub fn fit<S: SnapshotSink + ?Sized>(
        &mut self,
        data: &Dataset,
        cfg: &TrainConfig,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> Result<FitReport> {
        cfg.validate()?;
        if data.is_empty() {
            return Err(Error::InvalidConfig(
                "train dataset must not be empty".to_owned(),
            ));
        }

        let mut rng = cfg.shuffle.rng();
        let mut order: Vec<usize> = (0..data.len()).collect();
        let mut trainer = self.trainer();
        let mut metrics = EpochMetrics::with_capacity(data.len());
        let mut report = FitReport::default();

        info!(
            samples = data.len(),
            epochs = cfg.epochs,
            batch_size = cfg.batch_size,
            batches_per_epoch = batch_count(data.len(), cfg.batch_size),
            learning_rate = cfg.learning_rate,
            "training started"
        );

        for epoch in 1..=cfg.epochs {
            report.state = TrainingState::Running { epoch };
            metrics.reset();
            shuffle_order(&mut order, &mut rng);

            for (batch_idx, batch) in batches(&order, cfg.batch_size).enumerate() {
                if cancel.is_cancelled() {
                    info!(epoch, batch = batch_idx, "training cancelled");
                    report.state = TrainingState::Cancelled;
                    return Ok(report);
                }

                report.batches_run += 1;
                let outcome =
                    self.train_batch(data, batch, cfg.learning_rate, &mut trainer, &mut metrics);
                if let Err(what) = outcome {
                    match cfg.on_non_finite {
                        NonFinitePolicy::SkipBatch => {
                            warn!(epoch, batch = batch_idx, %what, "skipping non-finite batch");
                            report.skipped_batches += 1;
                        }
                        NonFinitePolicy::Abort => {
                            return Err(Error::NumericInstability {
                                epoch,
                                batch: batch_idx,
                                what,
                            });
                        }
                    }
                }
            }

            let mse = metrics.mse();
            let last = data.sample(order[order.len() - 1]);
            // Every epoch records at least one sample: the dataset is non-empty.
            let (last_output, last_target) = metrics.last().unwrap_or((f32::NAN, last.target));
            let snapshot = Snapshot {
                epoch,
                mse,
                last_target,
                last_output,
                last_input: last.input,
                parameters: self.parameters(),
            };

            info!(epoch, mse, "epoch complete");
            report.epoch_mse.push(mse);
            report.epochs_completed = epoch;
            sink.emit(snapshot);
        }

        report.state = TrainingState::Completed;
        Ok(report)
    }

    /// One mini-batch: accumulate every sample, then a single averaged update.
    ///
    /// Parameters are left untouched if anything went non-finite.
    fn train_batch(
        &mut self,
        data: &Dataset,
        batch: &[usize],
        lr: f32,
        trainer: &mut Trainer,
        metrics: &mut EpochMetrics,
    ) -> std::result::Result<(), Instability> {
        let Trainer {
            scratch,
            deltas,
            grads,
        } = trainer;
        grads.reset();

        let mut unstable = None;
        for &idx in batch {
            let input = data.input(idx);
            let target = data.target(idx);

            let y = self.forward(input, scratch);
            metrics.record(y, target);
            self.backward(scratch, target, deltas);
            grads.accumulate(input, scratch, deltas);

            if unstable.is_none() {
                if !scratch.is_finite() {
                    unstable = Some(Instability::Activation);
                } else if !deltas.is_finite() {
                    unstable = Some(Instability::ErrorTerm);
                }
            }
        }

        if let Some(what) = unstable {
            return Err(what);
        }
        if !grads.is_finite() {
            return Err(Instability::Gradient);
        }

        debug!(batch_len = batch.len(), "applying update");
        self.apply_update(grads, lr, batch.len());
        Ok(())
    }
}
