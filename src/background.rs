//! Off-thread training with an observer.
//!
//! `spawn_training` moves a `Network` into a dedicated training thread and starts a
//! second thread that feeds snapshots to an `Observer`. The two meet at a one-slot
//! mailbox:
//!
//! - the training thread copies parameters into a `Snapshot` and publishes it, then
//!   moves on to the next epoch
//! - the observer thread takes whatever is in the slot, at its own pace
//!
//! With `Backpressure::LatestOnly` a snapshot the observer has not picked up yet is
//! replaced by the newer one. With `Backpressure::Block` publishing waits for the slot
//! to drain. An observer that errors or panics is logged and skipped; training goes on.
//!
//! Owning the `Network` inside the thread means a second run cannot overlap with the
//! first: the network comes back only through `TrainingHandle::join`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::config::Backpressure;
use crate::snapshot::{Snapshot, SnapshotSink};
use crate::train::{CancelToken, FitReport};
use crate::{Dataset, Error, Network, Result, TrainConfig};

pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Receives one snapshot per completed epoch, on the observer thread.
///
/// Keep `on_snapshot` short: with `Backpressure::Block` it paces training.
pub trait Observer: Send {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> std::result::Result<(), ObserverError>;
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Snapshot>,
    closed: bool,
    replaced: u64,
}

#[derive(Debug, Default)]
struct Mailbox {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl Mailbox {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Nothing panics while the lock is held, but a poisoned slot is still usable.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }
}

/// Training-side end of the mailbox.
#[derive(Debug)]
pub struct Publisher {
    mailbox: Arc<Mailbox>,
    backpressure: Backpressure,
}

/// Observer-side end of the mailbox.
#[derive(Debug)]
pub struct Subscriber {
    mailbox: Arc<Mailbox>,
}

/// Create a connected publisher/subscriber pair.
pub fn mailbox(backpressure: Backpressure) -> (Publisher, Subscriber) {
    let mailbox = Arc::new(Mailbox::default());
    (
        Publisher {
            mailbox: Arc::clone(&mailbox),
            backpressure,
        },
        Subscriber { mailbox },
    )
}

impl Publisher {
    /// Snapshots that were overwritten before the subscriber saw them.
    pub fn replaced(&self) -> u64 {
        self.mailbox.lock().replaced
    }
}

impl SnapshotSink for Publisher {
    fn emit(&mut self, snapshot: Snapshot) {
        let mut slot = self.mailbox.lock();
        if slot.closed {
            return;
        }
        match self.backpressure {
            Backpressure::LatestOnly => {
                if let Some(old) = slot.pending.replace(snapshot) {
                    slot.replaced += 1;
                    debug!(epoch = old.epoch, "observer lagging, dropped snapshot");
                }
            }
            Backpressure::Block => {
                while slot.pending.is_some() && !slot.closed {
                    slot = self
                        .mailbox
                        .changed
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                if slot.closed {
                    return;
                }
                slot.pending = Some(snapshot);
            }
        }
        drop(slot);
        self.mailbox.changed.notify_all();
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.mailbox.close();
    }
}

impl Subscriber {
    /// Block until a snapshot is available.
    ///
    /// Returns `None` once the publisher is gone and the slot is empty; a snapshot
    /// published right before closing is still delivered.
    pub fn recv(&self) -> Option<Snapshot> {
        let mut slot = self.mailbox.lock();
        loop {
            if let Some(snapshot) = slot.pending.take() {
                drop(slot);
                self.mailbox.changed.notify_all();
                return Some(snapshot);
            }
            if slot.closed {
                return None;
            }
            slot = self
                .mailbox
                .changed
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Take a pending snapshot without waiting.
    pub fn try_recv(&self) -> Option<Snapshot> {
        let snapshot = self.mailbox.lock().pending.take();
        if snapshot.is_some() {
            self.mailbox.changed.notify_all();
        }
        snapshot
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        // Unblocks a publisher waiting under `Backpressure::Block`.
        self.mailbox.close();
    }
}

/// Feed snapshots to `observer` until the publisher closes. Returns how many were delivered
/// successfully.
fn run_observer<O: Observer>(subscriber: Subscriber, mut observer: O) -> usize {
    let mut delivered = 0;
    while let Some(snapshot) = subscriber.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.on_snapshot(&snapshot)));
        match outcome {
            Ok(Ok(())) => delivered += 1,
            Ok(Err(err)) => warn!(epoch = snapshot.epoch, error = %err, "observer failed"),
            Err(_) => warn!(epoch = snapshot.epoch, "observer panicked"),
        }
    }
    delivered
}

/// A training run on a background thread.
#[derive(Debug)]
pub struct TrainingHandle {
    cancel: CancelToken,
    trainer: JoinHandle<Result<(Network, FitReport)>>,
    observer: JoinHandle<usize>,
}

impl TrainingHandle {
    /// Ask the run to stop at the next batch boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once the training thread has returned (the observer may still be draining).
    pub fn is_finished(&self) -> bool {
        self.trainer.is_finished()
    }

    /// Wait for training and the observer loop to finish.
    ///
    /// Returns the trained network with its report.
    pub fn join(self) -> Result<(Network, FitReport)> {
        let outcome = self
            .trainer
            .join()
            .map_err(|_| Error::Training("training thread panicked".to_owned()));
        match self.observer.join() {
            Ok(delivered) => debug!(delivered, "observer loop finished"),
            Err(_) => warn!("observer thread panicked"),
        }
        outcome?
    }
}

/// Validate the inputs, then train `network` on a background thread, delivering snapshots to
/// `observer` on another.
pub fn spawn_training<O>(
    network: Network,
    data: Dataset,
    cfg: TrainConfig,
    observer: O,
) -> Result<TrainingHandle>
where
    O: Observer + 'static,
{
    cfg.validate()?;
    if data.is_empty() {
        return Err(Error::InvalidConfig(
            "train dataset must not be empty".to_owned(),
        ));
    }

    let (mut publisher, subscriber) = mailbox(cfg.backpressure);
    let cancel = CancelToken::new();

    let observer = thread::Builder::new()
        .name("dewpoint-observer".to_owned())
        .spawn(move || run_observer(subscriber, observer))?;

    let token = cancel.clone();
    let trainer = thread::Builder::new()
        .name("dewpoint-train".to_owned())
        .spawn(move || -> Result<(Network, FitReport)> {
            let mut network = network;
            let report = network.fit(&data, &cfg, &mut publisher, &token)?;
            Ok((network, report))
        })?;

    Ok(TrainingHandle {
        cancel,
        trainer,
        observer,
    })
}
