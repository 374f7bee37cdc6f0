//! Per-epoch metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop). The training
//! loop records one `(predicted, actual)` pair per processed sample and derives the
//! epoch MSE from scratch once the epoch is over.

/// `sum_i (predicted[i] - actual[i])^2 / (2 N)`.
///
/// Returns `0.0` for empty input. Panics if the lengths differ.
pub fn mse(predicted: &[f32], actual: &[f32]) -> f32 {
    assert_eq!(
        predicted.len(),
        actual.len(),
        "predicted len {} does not match actual len {}",
        predicted.len(),
        actual.len()
    );

    if predicted.is_empty() {
        return 0.0;
    }

    // Accumulate in f64: a full epoch can be 10^5 samples.
    let sum_sq: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(&p, &a)| {
            let diff = f64::from(p) - f64::from(a);
            diff * diff
        })
        .sum();
    (sum_sq / (2.0 * predicted.len() as f64)) as f32
}

/// Parallel `predicted` / `actual` sequences for the epoch in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochMetrics {
    predicted: Vec<f32>,
    actual: Vec<f32>,
}

impl EpochMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            predicted: Vec::with_capacity(capacity),
            actual: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn record(&mut self, predicted: f32, actual: f32) {
        self.predicted.push(predicted);
        self.actual.push(actual);
    }

    /// Drop all pairs, keeping the allocation.
    pub fn reset(&mut self) {
        self.predicted.clear();
        self.actual.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.predicted.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.predicted.is_empty()
    }

    pub fn predicted(&self) -> &[f32] {
        &self.predicted
    }

    pub fn actual(&self) -> &[f32] {
        &self.actual
    }

    /// The most recently recorded `(predicted, actual)` pair.
    pub fn last(&self) -> Option<(f32, f32)> {
        Some((*self.predicted.last()?, *self.actual.last()?))
    }

    pub fn mse(&self) -> f32 {
        mse(&self.predicted, &self.actual)
    }
}
