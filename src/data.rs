//! Contiguous dataset storage.
//!
//! The training loop indexes samples through a shuffled permutation, so `Dataset`
//! stores inputs row-major in one buffer and targets in another and hands out slices.
//! Values are expected to be normalized into `[0, 1]` already; nothing here checks that.

use crate::network::INPUT_SIZE;
use crate::{Error, Result};

/// One training example: a normalized reading and its normalized target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub input: [f32; INPUT_SIZE],
    pub target: f32,
}

/// A supervised dataset: inputs (X) of width `INPUT_SIZE` and scalar targets (Y).
///
/// Stored as contiguous buffers:
/// - `inputs.len() == len * INPUT_SIZE`
/// - `targets.len() == len`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    inputs: Vec<f32>,
    targets: Vec<f32>,
}

impl Dataset {
    /// Build a dataset from flat buffers.
    pub fn from_flat(inputs: Vec<f32>, targets: Vec<f32>) -> Result<Self> {
        if inputs.len() % INPUT_SIZE != 0 {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input size {INPUT_SIZE}",
                inputs.len()
            )));
        }
        let len = inputs.len() / INPUT_SIZE;
        if targets.len() != len {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match number of input rows {len}",
                targets.len()
            )));
        }
        Ok(Self { inputs, targets })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[f32]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let mut flat = Vec::with_capacity(inputs.len() * INPUT_SIZE);
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != INPUT_SIZE {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {INPUT_SIZE}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            inputs: flat,
            targets: targets.to_vec(),
        })
    }

    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut inputs = Vec::with_capacity(samples.len() * INPUT_SIZE);
        let mut targets = Vec::with_capacity(samples.len());
        for s in samples {
            inputs.extend_from_slice(&s.input);
            targets.push(s.target);
        }
        Self { inputs, targets }
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[inline]
    /// Returns the `idx`-th input row (shape: `(INPUT_SIZE,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * INPUT_SIZE;
        &self.inputs[start..start + INPUT_SIZE]
    }

    #[inline]
    /// Returns the `idx`-th target.
    ///
    /// Panics if `idx >= len`.
    pub fn target(&self, idx: usize) -> f32 {
        self.targets[idx]
    }

    /// Returns the `idx`-th sample by value.
    pub fn sample(&self, idx: usize) -> Sample {
        let mut input = [0.0_f32; INPUT_SIZE];
        input.copy_from_slice(self.input(idx));
        Sample {
            input,
            target: self.target(idx),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).map(move |idx| self.sample(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_from_flat_validates_shapes() {
        let ok = Dataset::from_flat(vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5], vec![0.0, 1.0]);
        assert_eq!(ok.unwrap().len(), 2);

        assert!(Dataset::from_flat(vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(Dataset::from_flat(vec![0.0; 3], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn dataset_from_rows_rejects_ragged_rows() {
        let err = Dataset::from_rows(&[vec![0.0; 3], vec![0.0; 2]], &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(Dataset::from_rows(&[vec![0.0; 3]], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn rows_and_samples_agree() {
        let samples = [
            Sample {
                input: [0.1, 0.2, 0.3],
                target: 0.4,
            },
            Sample {
                input: [0.5, 0.6, 0.7],
                target: 0.8,
            },
        ];
        let a = Dataset::from_samples(&samples);
        let b = Dataset::from_rows(&[vec![0.1, 0.2, 0.3], vec![0.5, 0.6, 0.7]], &[0.4, 0.8]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.input(1), &[0.5, 0.6, 0.7]);
        assert_eq!(a.target(0), 0.4);
        assert_eq!(a.iter().collect::<Vec<_>>(), samples);
    }

    #[test]
    fn empty_dataset_is_representable() {
        let empty = Dataset::from_flat(Vec::new(), Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }
}
