//! Bernoulli thinning of lazy candidate sequences.

use rand::Rng;

use crate::errors::{CfepiError, Result};

/// Retains each candidate independently with a fixed probability.
///
/// Exactly one uniform draw in `[0, 1)` is consumed per candidate, in the order the candidates
/// are produced, and a candidate is retained when the draw is below the probability. For a fixed
/// generator state the retained subsequence is therefore fully determined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilisticSampler {
    probability: f64,
}

impl ProbabilisticSampler {
    pub fn new(probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(CfepiError::InitializationError(format!(
                "Event probability must be within [0, 1], got {probability}"
            )));
        }
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Thin `candidates` lazily using `rng`.
    pub fn sample<I: Iterator, R: Rng>(&self, candidates: I, rng: R) -> Sample<I, R> {
        Sample {
            candidates,
            probability: self.probability,
            rng,
        }
    }
}

/// Iterator adapter returned by `ProbabilisticSampler::sample`.
pub struct Sample<I, R> {
    candidates: I,
    probability: f64,
    rng: R,
}

impl<I: Iterator, R: Rng> Iterator for Sample<I, R> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.candidates.by_ref() {
            if self.rng.random::<f64>() < self.probability {
                return Some(candidate);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.candidates.size_hint().1)
    }
}
