//! Mini-batch gradient accumulation.
//!
//! `Gradients` mirrors the shape of every parameter tensor in a `Network` and holds
//! per-batch *sums*. The training loop zeroes it at the start of each batch, adds one
//! contribution per sample, and hands it to `Network::apply_update`, which divides by
//! the batch length.

use crate::network::{Deltas, Scratch};
use crate::{Layer, Network};

/// Gradient sums for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    in_dim: usize,
    /// Row-major (out_dim, in_dim), same layout as `Layer` weights.
    d_weights: Vec<f32>,
    d_biases: Vec<f32>,
}

impl LayerGradients {
    pub fn new(layer: &Layer) -> Self {
        Self {
            in_dim: layer.in_dim(),
            d_weights: vec![0.0; layer.in_dim() * layer.out_dim()],
            d_biases: vec![0.0; layer.out_dim()],
        }
    }

    #[inline]
    pub fn d_weights(&self) -> &[f32] {
        &self.d_weights
    }

    #[inline]
    pub fn d_biases(&self) -> &[f32] {
        &self.d_biases
    }

    /// `d_w[o][i] += deltas[o] * inputs[i]`, `d_b[o] += deltas[o]`.
    #[inline]
    pub fn accumulate(&mut self, deltas: &[f32], inputs: &[f32]) {
        debug_assert_eq!(deltas.len(), self.d_biases.len());
        debug_assert_eq!(inputs.len(), self.in_dim);

        for (o, &d) in deltas.iter().enumerate() {
            let row = o * self.in_dim;
            for (i, &x) in inputs.iter().enumerate() {
                self.d_weights[row + i] = d.mul_add(x, self.d_weights[row + i]);
            }
            self.d_biases[o] += d;
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.d_weights.fill(0.0);
        self.d_biases.fill(0.0);
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.d_weights
            .iter()
            .chain(&self.d_biases)
            .all(|g| g.is_finite())
    }
}

/// Gradient sums for a whole `Network`.
///
/// Allocate once via `Network::gradients()` and reuse across batches.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    hidden1: LayerGradients,
    hidden2: LayerGradients,
    output: LayerGradients,
}

impl Gradients {
    pub fn new(net: &Network) -> Self {
        Self {
            hidden1: LayerGradients::new(net.hidden1()),
            hidden2: LayerGradients::new(net.hidden2()),
            output: LayerGradients::new(net.output_layer()),
        }
    }

    #[inline]
    pub fn hidden1(&self) -> &LayerGradients {
        &self.hidden1
    }

    #[inline]
    pub fn hidden2(&self) -> &LayerGradients {
        &self.hidden2
    }

    #[inline]
    pub fn output(&self) -> &LayerGradients {
        &self.output
    }

    #[inline]
    pub(crate) fn layers(&self) -> (&LayerGradients, &LayerGradients, &LayerGradients) {
        (&self.hidden1, &self.hidden2, &self.output)
    }

    /// Zero every sum. Called at the start of each batch.
    pub fn reset(&mut self) {
        self.hidden1.reset();
        self.hidden2.reset();
        self.output.reset();
    }

    /// Add one sample's contribution.
    ///
    /// `scratch` and `deltas` must come from the forward/backward pass of this same `input`.
    pub fn accumulate(&mut self, input: &[f32], scratch: &Scratch, deltas: &Deltas) {
        self.output.accumulate(&[deltas.output], &scratch.hidden2);
        self.hidden2.accumulate(&deltas.hidden2, &scratch.hidden1);
        self.hidden1.accumulate(&deltas.hidden1, input);
    }

    pub fn is_finite(&self) -> bool {
        self.hidden1.is_finite() && self.hidden2.is_finite() && self.output.is_finite()
    }
}
