//! Synthetic dew-point corpus.
//!
//! Draws temperature (°C), relative humidity (%) and pressure (hPa) uniformly from their
//! physical ranges, computes a Magnus-style dew point for each reading, and min-max
//! normalizes everything into `[0, 1]`. The dew-point range is discovered from the
//! generated corpus and returned as a `TargetRange` so network outputs can be mapped
//! back to °C.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::Sample;
use crate::{Dataset, Error, Result};

pub const TEMPERATURE_RANGE: (f32, f32) = (-10.0, 40.0);
pub const HUMIDITY_RANGE: (f32, f32) = (15.0, 100.0);
pub const PRESSURE_RANGE: (f32, f32) = (900.0, 1100.0);

const MAGNUS_A: f32 = 17.27;
const MAGNUS_B: f32 = 237.7;
/// Standard sea-level pressure, hPa.
const STANDARD_PRESSURE: f32 = 1013.25;

/// Dew point in °C for a temperature (°C), relative humidity (%) and pressure (hPa).
///
/// The vapour pressure is scaled by `pressure / STANDARD_PRESSURE` and fed straight into
/// the logarithm, without dividing by the 6.112 hPa reference, so results sit below the
/// textbook Magnus value. Trained models depend on this exact mapping.
pub fn dew_point(temperature: f32, humidity: f32, pressure: f32) -> f32 {
    let saturation = 6.112 * ((MAGNUS_A * temperature) / (MAGNUS_B + temperature)).exp();
    let vapour = (humidity * pressure * saturation) / (100.0 * STANDARD_PRESSURE);
    let ln = vapour.ln();
    (MAGNUS_B * ln) / (MAGNUS_A - ln)
}

#[inline]
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    (value - min) / (max - min)
}

/// Normalize a raw (T, RH, P) reading into network input space.
pub fn normalize_reading(temperature: f32, humidity: f32, pressure: f32) -> [f32; 3] {
    [
        normalize(temperature, TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1),
        normalize(humidity, HUMIDITY_RANGE.0, HUMIDITY_RANGE.1),
        normalize(pressure, PRESSURE_RANGE.0, PRESSURE_RANGE.1),
    ]
}

/// Observed dew-point range of a corpus, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min: f32,
    pub max: f32,
}

impl TargetRange {
    /// Smallest range covering every value, or `None` for an empty or non-finite input.
    pub fn covering(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        let mut range: Option<Self> = None;
        for v in values {
            if !v.is_finite() {
                return None;
            }
            range = Some(match range {
                None => Self { min: v, max: v },
                Some(r) => Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                },
            });
        }
        range
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Map °C into `[0, 1]`. A degenerate range maps everything to `0`.
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.span();
        if span == 0.0 {
            return 0.0;
        }
        (value - self.min) / span
    }

    /// Map a network output back to °C. Outputs above 1 land above `max`; they are
    /// not clamped.
    pub fn denormalize(&self, value: f32) -> f32 {
        value * self.span() + self.min
    }
}

/// A generated, normalized corpus and the range needed to read its targets in °C.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub dataset: Dataset,
    pub target_range: TargetRange,
}

/// Generate `samples` random readings.
pub fn generate<R: Rng + ?Sized>(samples: usize, rng: &mut R) -> Result<Corpus> {
    if samples == 0 {
        return Err(Error::InvalidData(
            "corpus needs at least one sample".to_owned(),
        ));
    }

    let raw: Vec<([f32; 3], f32)> = (0..samples)
        .map(|_| {
            let t = rng.gen_range(TEMPERATURE_RANGE.0..TEMPERATURE_RANGE.1);
            let rh = rng.gen_range(HUMIDITY_RANGE.0..HUMIDITY_RANGE.1);
            let p = rng.gen_range(PRESSURE_RANGE.0..PRESSURE_RANGE.1);
            ([t, rh, p], dew_point(t, rh, p))
        })
        .collect();

    let target_range = TargetRange::covering(raw.iter().map(|(_, td)| *td))
        .ok_or_else(|| Error::InvalidData("generated a non-finite dew point".to_owned()))?;

    let normalized: Vec<Sample> = raw
        .iter()
        .map(|&([t, rh, p], td)| Sample {
            input: normalize_reading(t, rh, p),
            target: target_range.normalize(td),
        })
        .collect();

    Ok(Corpus {
        dataset: Dataset::from_samples(&normalized),
        target_range,
    })
}

pub fn generate_with_seed(samples: usize, seed: u64) -> Result<Corpus> {
    generate(samples, &mut StdRng::seed_from_u64(seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dew_point_matches_hand_computation() {
        // T=20, RH=50, P=1013.25: es = 6.112 * e^(345.4/257.7)
        let es = 6.112_f32 * (345.4_f32 / 257.7).exp();
        let ln = (0.5 * es).ln();
        let expected = 237.7 * ln / (17.27 - ln);
        assert_relative_eq!(dew_point(20.0, 50.0, 1013.25), expected, epsilon = 1e-3);
    }

    #[test]
    fn dew_point_rises_with_humidity_and_temperature() {
        assert!(dew_point(20.0, 80.0, 1000.0) > dew_point(20.0, 40.0, 1000.0));
        assert!(dew_point(30.0, 60.0, 1000.0) > dew_point(10.0, 60.0, 1000.0));
    }

    #[test]
    fn reading_bounds_normalize_to_unit_interval() {
        assert_eq!(normalize_reading(-10.0, 15.0, 900.0), [0.0, 0.0, 0.0]);
        assert_eq!(normalize_reading(40.0, 100.0, 1100.0), [1.0, 1.0, 1.0]);
        assert_relative_eq!(normalize_reading(15.0, 57.5, 1000.0)[0], 0.5);
    }

    #[test]
    fn target_range_round_trips() {
        let r = TargetRange { min: -20.0, max: 30.0 };
        assert_relative_eq!(r.normalize(5.0), 0.5);
        assert_relative_eq!(r.denormalize(0.5), 5.0);
        assert_relative_eq!(r.denormalize(r.normalize(12.3)), 12.3, epsilon = 1e-5);
    }

    #[test]
    fn outputs_beyond_one_are_not_clamped() {
        let r = TargetRange { min: 0.0, max: 10.0 };
        assert_relative_eq!(r.denormalize(1.5), 15.0);
    }

    #[test]
    fn degenerate_range_normalizes_to_zero() {
        let r = TargetRange { min: 3.0, max: 3.0 };
        assert_eq!(r.normalize(3.0), 0.0);
        assert_eq!(r.denormalize(0.7), 3.0);
    }

    #[test]
    fn covering_rejects_empty_and_non_finite() {
        assert!(TargetRange::covering([]).is_none());
        assert!(TargetRange::covering([1.0, f32::NAN]).is_none());
        assert_eq!(
            TargetRange::covering([2.0, -1.0, 5.0]),
            Some(TargetRange { min: -1.0, max: 5.0 })
        );
    }

    #[test]
    fn corpus_is_normalized() {
        let corpus = generate_with_seed(500, 42).unwrap();
        assert_eq!(corpus.dataset.len(), 500);
        assert!(corpus.target_range.min < corpus.target_range.max);

        let mut targets = Vec::new();
        for s in corpus.dataset.iter() {
            assert!(s.input.iter().all(|&x| (0.0..=1.0).contains(&x)), "{s:?}");
            assert!((0.0..=1.0).contains(&s.target), "{s:?}");
            targets.push(s.target);
        }
        // The extremes of the corpus define the range.
        assert!(targets.iter().any(|&t| t == 0.0));
        assert!(targets.iter().any(|&t| t == 1.0));
    }

    #[test]
    fn same_seed_same_corpus() {
        assert_eq!(generate_with_seed(50, 9).unwrap(), generate_with_seed(50, 9).unwrap());
    }

    #[test]
    fn single_sample_corpus_has_zero_target() {
        let corpus = generate_with_seed(1, 0).unwrap();
        assert_eq!(corpus.dataset.target(0), 0.0);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(generate_with_seed(0, 0), Err(Error::InvalidData(_))));
    }
}
