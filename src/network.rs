use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::activation::relu_grad;
use crate::snapshot::{LayerParameters, Parameters};
use crate::{Dataset, EpochMetrics, Error, Gradients, Layer, Result};

pub const INPUT_SIZE: usize = 3;
pub const HIDDEN1_SIZE: usize = 3;
pub const HIDDEN2_SIZE: usize = 2;
pub const OUTPUT_SIZE: usize = 1;

/// The parameter store: a fixed 3 -> 3 -> 2 -> 1 ReLU network.
///
/// Only [`Network::apply_update`] mutates parameters after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    hidden1: Layer,
    hidden2: Layer,
    output: Layer,
}

/// Activations cached by `Network::forward` for the matching `Network::backward`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scratch {
    pub hidden1: [f32; HIDDEN1_SIZE],
    pub hidden2: [f32; HIDDEN2_SIZE],
    pub output: f32,
}

/// Per-neuron error terms produced by `Network::backward`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deltas {
    pub hidden1: [f32; HIDDEN1_SIZE],
    pub hidden2: [f32; HIDDEN2_SIZE],
    pub output: f32,
}

impl Scratch {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.output.is_finite()
            && self.hidden1.iter().all(|v| v.is_finite())
            && self.hidden2.iter().all(|v| v.is_finite())
    }
}

impl Deltas {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.output.is_finite()
            && self.hidden1.iter().all(|v| v.is_finite())
            && self.hidden2.iter().all(|v| v.is_finite())
    }
}

impl Network {
    pub fn new_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(&mut rng)
    }

    /// Initialize every weight and bias uniformly in `[0, 1)`.
    pub fn new_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let hidden1 = Layer::new_with_rng(INPUT_SIZE, HIDDEN1_SIZE, rng);
        let hidden2 = Layer::new_with_rng(HIDDEN1_SIZE, HIDDEN2_SIZE, rng);
        let output = Layer::new_with_rng(HIDDEN2_SIZE, OUTPUT_SIZE, rng);
        Self {
            hidden1,
            hidden2,
            output,
        }
    }

    /// Assemble a network from explicit layers, checking them against the fixed architecture.
    pub fn from_layers(hidden1: Layer, hidden2: Layer, output: Layer) -> Result<Self> {
        check_dims("hidden1", &hidden1, INPUT_SIZE, HIDDEN1_SIZE)?;
        check_dims("hidden2", &hidden2, HIDDEN1_SIZE, HIDDEN2_SIZE)?;
        check_dims("output", &output, HIDDEN2_SIZE, OUTPUT_SIZE)?;
        Ok(Self {
            hidden1,
            hidden2,
            output,
        })
    }

    /// Rebuild a network from a parameter copy (e.g. a snapshot or a saved model).
    ///
    /// Rejects shapes that do not match the architecture and non-finite values.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let hidden1 = layer_from_parameters("hidden1", &params.hidden1, INPUT_SIZE)?;
        let hidden2 = layer_from_parameters("hidden2", &params.hidden2, HIDDEN1_SIZE)?;
        let output = layer_from_parameters("output", &params.output, HIDDEN2_SIZE)?;
        Self::from_layers(hidden1, hidden2, output)
    }

    #[inline]
    pub fn hidden1(&self) -> &Layer {
        &self.hidden1
    }

    #[inline]
    pub fn hidden2(&self) -> &Layer {
        &self.hidden2
    }

    #[inline]
    pub fn output_layer(&self) -> &Layer {
        &self.output
    }

    pub fn gradients(&self) -> Gradients {
        Gradients::new(self)
    }

    /// Value copy of all parameters, rows per neuron.
    pub fn parameters(&self) -> Parameters {
        Parameters {
            hidden1: LayerParameters::from_layer(&self.hidden1),
            hidden2: LayerParameters::from_layer(&self.hidden2),
            output: LayerParameters::from_layer(&self.output),
        }
    }

    /// Forward pass for a single sample.
    ///
    /// Caches both hidden activations and the output in `scratch` and returns the output.
    /// The next `backward` call must use this same `scratch`.
    ///
    /// Panics if `input.len() != INPUT_SIZE`.
    pub fn forward(&self, input: &[f32], scratch: &mut Scratch) -> f32 {
        assert_eq!(
            input.len(),
            INPUT_SIZE,
            "input len {} does not match model input size {INPUT_SIZE}",
            input.len()
        );

        self.hidden1.forward(input, &mut scratch.hidden1);
        self.hidden2.forward(&scratch.hidden1, &mut scratch.hidden2);
        let mut out = [0.0_f32; OUTPUT_SIZE];
        self.output.forward(&scratch.hidden2, &mut out);
        scratch.output = out[0];
        scratch.output
    }

    /// Backward pass for the sample whose activations are cached in `scratch`.
    ///
    /// - `delta_out = (output - target) * relu'(output)`
    /// - `delta2[i] = delta_out * relu'(a2[i]) * w_out[i]`
    /// - `delta1[i] = relu'(a1[i]) * sum_j delta2[j] * w2[j][i]`
    ///
    /// The output term is the plain residual, with no `2 / N` factor. Batch averaging and the
    /// learning rate absorb the scale.
    ///
    /// Overwrites `deltas` and returns `delta_out`.
    pub fn backward(&self, scratch: &Scratch, target: f32, deltas: &mut Deltas) -> f32 {
        let output = scratch.output;
        deltas.output = (output - target) * relu_grad(output);

        self.output.backpropagate(&[deltas.output], &mut deltas.hidden2);
        for (d, &a) in deltas.hidden2.iter_mut().zip(&scratch.hidden2) {
            *d *= relu_grad(a);
        }

        self.hidden2.backpropagate(&deltas.hidden2, &mut deltas.hidden1);
        for (d, &a) in deltas.hidden1.iter_mut().zip(&scratch.hidden1) {
            *d *= relu_grad(a);
        }

        deltas.output
    }

    /// Apply the batch-mean SGD step: `p -= lr * (g / batch_len)` for every parameter.
    pub fn apply_update(&mut self, grads: &Gradients, lr: f32, batch_len: usize) {
        let (h1, h2, out) = grads.layers();
        self.hidden1.apply_update(h1.d_weights(), h1.d_biases(), lr, batch_len);
        self.hidden2.apply_update(h2.d_weights(), h2.d_biases(), lr, batch_len);
        self.output.apply_update(out.d_weights(), out.d_biases(), lr, batch_len);
    }

    /// Shape-checked inference for one sample.
    pub fn predict(&self, input: &[f32]) -> Result<f32> {
        if input.len() != INPUT_SIZE {
            return Err(Error::InvalidData(format!(
                "input len {} does not match model input size {INPUT_SIZE}",
                input.len()
            )));
        }
        let mut scratch = Scratch::default();
        Ok(self.forward(input, &mut scratch))
    }

    /// Evaluate `sum (y - t)^2 / (2 N)` over a dataset without touching parameters.
    pub fn evaluate_mse(&self, data: &Dataset) -> Result<f32> {
        if data.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }

        let mut scratch = Scratch::default();
        let mut metrics = EpochMetrics::with_capacity(data.len());
        for idx in 0..data.len() {
            let y = self.forward(data.input(idx), &mut scratch);
            metrics.record(y, data.target(idx));
        }
        Ok(metrics.mse())
    }
}

fn check_dims(name: &str, layer: &Layer, in_dim: usize, out_dim: usize) -> Result<()> {
    if layer.in_dim() != in_dim || layer.out_dim() != out_dim {
        return Err(Error::ShapeMismatch(format!(
            "{name} layer is {}x{}, expected {out_dim}x{in_dim}",
            layer.out_dim(),
            layer.in_dim()
        )));
    }
    Ok(())
}

fn layer_from_parameters(name: &str, params: &LayerParameters, in_dim: usize) -> Result<Layer> {
    let out_dim = params.biases.len();
    let mut weights = Vec::with_capacity(out_dim * in_dim);
    for (o, row) in params.weights.iter().enumerate() {
        if row.len() != in_dim {
            return Err(Error::ShapeMismatch(format!(
                "{name} weight row {o} has len {}, expected {in_dim}",
                row.len()
            )));
        }
        weights.extend_from_slice(row);
    }
    if params.weights.len() != out_dim {
        return Err(Error::ShapeMismatch(format!(
            "{name} has {} weight rows but {out_dim} biases",
            params.weights.len()
        )));
    }
    if !weights.iter().chain(&params.biases).all(|p| p.is_finite()) {
        return Err(Error::InvalidData(format!("{name} parameters must be finite")));
    }
    Layer::from_parts(in_dim, out_dim, weights, params.biases.clone())
}
