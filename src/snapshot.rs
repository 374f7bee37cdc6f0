//! Epoch-boundary snapshots.
//!
//! A `Snapshot` is a value copy of every parameter plus the epoch's metrics. The
//! training loop builds it after the last batch of an epoch and before the next
//! epoch's first update, so observers never see a half-updated network.

use serde::{Deserialize, Serialize};

use crate::Layer;
use crate::network::INPUT_SIZE;

/// Parameters of one layer, one weight row per neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParameters {
    /// `weights[o][i]`: weight from input `i` into neuron `o`.
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,
}

impl LayerParameters {
    pub fn from_layer(layer: &Layer) -> Self {
        let weights = (0..layer.out_dim()).map(|o| layer.row(o).to_vec()).collect();
        Self {
            weights,
            biases: layer.biases().to_vec(),
        }
    }
}

/// A copy of every parameter of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub hidden1: LayerParameters,
    pub hidden2: LayerParameters,
    /// Single row (one output neuron) and a single bias.
    pub output: LayerParameters,
}

/// State handed to observers once per completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 1-based epoch number.
    pub epoch: usize,
    pub mse: f32,
    /// Target of the last sample processed in the epoch.
    pub last_target: f32,
    /// Network output for that sample, taken before the batch's update.
    pub last_output: f32,
    pub last_input: [f32; INPUT_SIZE],
    pub parameters: Parameters,
}

/// Destination for snapshots emitted by the training loop.
///
/// `emit` runs on the training thread between epochs; implementations should hand the
/// value off and return quickly.
pub trait SnapshotSink {
    fn emit(&mut self, snapshot: Snapshot);
}

/// Collects every snapshot in order.
impl SnapshotSink for Vec<Snapshot> {
    fn emit(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }
}

/// Discards snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl SnapshotSink for Discard {
    fn emit(&mut self, _snapshot: Snapshot) {}
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for &mut S {
    fn emit(&mut self, snapshot: Snapshot) {
        (**self).emit(snapshot);
    }
}
