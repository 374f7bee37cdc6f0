use rand::Rng;

use crate::activation::relu;
use crate::{Error, Result};

/// A dense ReLU layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (out_dim, in_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    /// Build a layer with every weight and bias drawn uniformly from `[0, 1)`.
    pub fn new_with_rng<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self {
        let weights = (0..in_dim * out_dim).map(|_| rng.gen::<f32>()).collect();
        let biases = (0..out_dim).map(|_| rng.gen::<f32>()).collect();
        Self {
            in_dim,
            out_dim,
            weights,
            biases,
        }
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` is row-major with shape `(out_dim, in_dim)`.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if weights.len() != in_dim * out_dim {
            return Err(Error::ShapeMismatch(format!(
                "weights length {} does not match out_dim * in_dim ({out_dim} * {in_dim})",
                weights.len()
            )));
        }
        if biases.len() != out_dim {
            return Err(Error::ShapeMismatch(format!(
                "biases length {} does not match out_dim {out_dim}",
                biases.len()
            )));
        }
        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    #[cfg(test)]
    pub(crate) fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    #[cfg(test)]
    pub(crate) fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Weights feeding neuron `o`, one per input.
    #[inline]
    pub fn row(&self, o: usize) -> &[f32] {
        let start = o * self.in_dim;
        &self.weights[start..start + self.in_dim]
    }

    /// Forward pass for a single sample.
    ///
    /// Computes `outputs[o] = relu(b[o] + sum_i W[o][i] * inputs[i])`.
    #[inline]
    pub fn forward(&self, inputs: &[f32], outputs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.in_dim);
        debug_assert_eq!(outputs.len(), self.out_dim);

        for o in 0..self.out_dim {
            let mut sum = self.biases[o];
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                sum = self.weights[row + i].mul_add(inputs[i], sum);
            }
            outputs[o] = relu(sum);
        }
    }

    /// Push this layer's error terms back through its weights.
    ///
    /// Overwrites `upstream[i] = sum_o deltas[o] * W[o][i]` (the transposed product).
    /// The caller still has to gate the result with the previous layer's ReLU derivative.
    #[inline]
    pub fn backpropagate(&self, deltas: &[f32], upstream: &mut [f32]) {
        debug_assert_eq!(deltas.len(), self.out_dim);
        debug_assert_eq!(upstream.len(), self.in_dim);

        upstream.fill(0.0);
        for o in 0..self.out_dim {
            let d = deltas[o];
            let row = o * self.in_dim;
            for i in 0..self.in_dim {
                upstream[i] = d.mul_add(self.weights[row + i], upstream[i]);
            }
        }
    }

    /// SGD step with batch averaging: `p -= lr * (g / batch_len)`.
    ///
    /// `d_weights` / `d_biases` are gradient *sums* over the batch.
    #[inline]
    pub fn apply_update(&mut self, d_weights: &[f32], d_biases: &[f32], lr: f32, batch_len: usize) {
        assert_eq!(
            d_weights.len(),
            self.weights.len(),
            "d_weights len {} does not match weights len {}",
            d_weights.len(),
            self.weights.len()
        );
        assert_eq!(
            d_biases.len(),
            self.biases.len(),
            "d_biases len {} does not match biases len {}",
            d_biases.len(),
            self.biases.len()
        );
        assert!(batch_len > 0, "batch_len must be > 0");

        let n = batch_len as f32;
        for (w, &g) in self.weights.iter_mut().zip(d_weights) {
            *w -= lr * (g / n);
        }
        for (b, &g) in self.biases.iter_mut().zip(d_biases) {
            *b -= lr * (g / n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixed_layer() -> Layer {
        // 2 -> 2, rows [1, -1] and [0.5, 0.25]
        Layer::from_parts(2, 2, vec![1.0, -1.0, 0.5, 0.25], vec![0.1, -0.2]).unwrap()
    }

    #[test]
    fn random_init_is_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Layer::new_with_rng(3, 4, &mut rng);
        assert_eq!(layer.weights().len(), 12);
        assert_eq!(layer.biases().len(), 4);
        assert!(
            layer
                .weights()
                .iter()
                .chain(layer.biases())
                .all(|&p| (0.0..1.0).contains(&p))
        );
    }

    #[test]
    fn from_parts_rejects_bad_shapes() {
        let err = Layer::from_parts(2, 2, vec![0.0; 3], vec![0.0; 2]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        let err = Layer::from_parts(2, 2, vec![0.0; 4], vec![0.0; 1]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn forward_applies_relu() {
        let layer = fixed_layer();
        let mut out = [0.0_f32; 2];
        layer.forward(&[1.0, 2.0], &mut out);
        // z0 = 0.1 + 1 - 2 = -0.9 -> 0
        // z1 = -0.2 + 0.5 + 0.5 = 0.8
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.8).abs() < 1e-6);
        assert_eq!(layer.row(1), &[0.5, 0.25]);
    }

    #[test]
    fn backpropagate_uses_transpose() {
        let layer = fixed_layer();
        let mut upstream = [9.0_f32; 2];
        layer.backpropagate(&[2.0, 4.0], &mut upstream);
        // upstream[0] = 2*1 + 4*0.5, upstream[1] = 2*(-1) + 4*0.25
        assert!((upstream[0] - 4.0).abs() < 1e-6);
        assert!((upstream[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn apply_update_divides_by_batch_len() {
        let mut layer = fixed_layer();
        layer.apply_update(&[4.0, 0.0, 0.0, 0.0], &[0.0, 2.0], 0.5, 4);
        // 1 - 0.5 * 4 / 4
        assert!((layer.weights()[0] - 0.5).abs() < 1e-6);
        assert_eq!(layer.weights()[1], -1.0);
        // -0.2 - 0.5 * 2 / 4
        assert!((layer.biases()[1] + 0.45).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn apply_update_panics_on_shape_mismatch() {
        let mut layer = fixed_layer();
        layer.apply_update(&[0.0; 3], &[0.0; 2], 0.1, 1);
    }
}
