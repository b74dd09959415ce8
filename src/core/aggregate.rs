//! Histograms of individuals per potential-state pattern.

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::core::state::{PotentialState, SimulationState};

/// Number of individuals exhibiting each distinct bit pattern at a point in time.
///
/// Patterns that no individual exhibits are not stored and count as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregatedState {
    time: usize,
    counts: BTreeMap<PotentialState, usize>,
}

impl AggregatedState {
    pub fn time(&self) -> usize {
        self.time
    }

    /// Number of individuals exhibiting exactly `pattern`.
    pub fn count(&self, pattern: PotentialState) -> usize {
        self.counts.get(&pattern).copied().unwrap_or(0)
    }

    /// Total number of individuals.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterate over the non-empty buckets in ascending pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (PotentialState, usize)> + '_ {
        self.counts.iter().map(|(&pattern, &count)| (pattern, count))
    }

    /// Number of non-empty buckets.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl From<&SimulationState> for AggregatedState {
    fn from(state: &SimulationState) -> Self {
        aggregate(state)
    }
}

/// Count the individuals of `state` per bit pattern.
pub fn aggregate(state: &SimulationState) -> AggregatedState {
    AggregatedState {
        time: state.time(),
        counts: state.iter().copied().counts().into_iter().collect(),
    }
}
