//! Per-individual compartment bit vectors and the population-wide state
//!
//! Every individual carries a `PotentialState`, a bit vector over the compartment space. In a
//! committed `SimulationState` each individual has exactly one bit set. While a time step is in
//! progress, the tentative buffers of a world may hold empty or multi-bit patterns.
//!

use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign, From, Into, Not};
use std::fmt;
use std::ops::{BitOr, Index, IndexMut};

use crate::core::compartments::MAX_COMPARTMENTS;

#[macro_export]
macro_rules! simulation_state {
    () => {
        $crate::core::SimulationState::new(0)
    };
    ($( $pattern:expr ; $count:expr ),+ $(,)?) => {
        $crate::core::SimulationState::from_iter(vec![$( $crate::core::SimulationState::uniform($pattern, $count) ),+])
    };
}

/// Bit vector over at most 64 compartments.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BitAnd,
    BitOr,
    Not,
    BitAndAssign,
    BitOrAssign,
    From,
    Into,
)]
pub struct PotentialState(u64);

impl PotentialState {
    /// Pattern without any compartment.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Pattern of exactly one compartment.
    pub fn single(compartment: usize) -> Self {
        debug_assert!(compartment < MAX_COMPARTMENTS);
        Self(1 << compartment)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of compartments in the pattern.
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn contains(&self, compartment: usize) -> bool {
        compartment < MAX_COMPARTMENTS && (self.0 >> compartment) & 1 == 1
    }

    pub fn intersects(&self, other: PotentialState) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, compartment: usize) {
        *self |= Self::single(compartment);
    }

    pub fn remove(&mut self, compartment: usize) {
        *self &= !Self::single(compartment);
    }

    /// Iterate over the compartment indices set in the pattern, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + use<> {
        let bits = self.0;
        (0..MAX_COMPARTMENTS).filter(move |index| (bits >> index) & 1 == 1)
    }
}

impl fmt::Display for PotentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// Potential states of the whole population at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimulationState {
    potential_states: Vec<PotentialState>,
    time: usize,
}

impl Index<usize> for SimulationState {
    type Output = PotentialState;

    fn index(&self, index: usize) -> &Self::Output {
        &self.potential_states[index]
    }
}

impl IndexMut<usize> for SimulationState {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.potential_states[index]
    }
}

impl FromIterator<SimulationState> for SimulationState {
    /// Concatenate populations. The time stamp of the result is zero.
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        let mut potential_states = Vec::new();
        for state in iter {
            potential_states.extend(state.potential_states);
        }
        Self {
            potential_states,
            time: 0,
        }
    }
}

impl FromIterator<PotentialState> for SimulationState {
    fn from_iter<I: IntoIterator<Item = PotentialState>>(iter: I) -> Self {
        Self {
            potential_states: iter.into_iter().collect(),
            time: 0,
        }
    }
}

impl BitOr for &SimulationState {
    type Output = SimulationState;

    fn bitor(self, other: Self) -> SimulationState {
        self.union(other)
    }
}

impl SimulationState {
    /// Construct a population of `population` individuals without any compartment.
    pub fn new(population: usize) -> Self {
        Self::uniform(PotentialState::empty(), population)
    }

    /// Construct a population of `population` individuals sharing the same pattern.
    pub fn uniform(pattern: PotentialState, population: usize) -> Self {
        Self {
            potential_states: vec![pattern; population],
            time: 0,
        }
    }

    /// State of the same size and time stamp where every pattern is empty.
    pub fn empty_like(&self) -> Self {
        Self {
            potential_states: vec![PotentialState::empty(); self.len()],
            time: self.time,
        }
    }

    pub fn len(&self) -> usize {
        self.potential_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.potential_states.is_empty()
    }

    pub fn time(&self) -> usize {
        self.time
    }

    pub fn set_time(&mut self, time: usize) {
        self.time = time;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PotentialState> {
        self.potential_states.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PotentialState> {
        self.potential_states.iter_mut()
    }

    pub fn as_slice(&self) -> &[PotentialState] {
        &self.potential_states
    }

    /// Clear every pattern while keeping population size and time stamp.
    pub fn clear(&mut self) {
        self.potential_states.fill(PotentialState::empty());
    }

    /// Check that every individual is in exactly one compartment.
    pub fn is_committed(&self) -> bool {
        self.potential_states.iter().all(|state| state.count() == 1)
    }

    /// Number of individuals exhibiting exactly `pattern`.
    pub fn count_pattern(&self, pattern: PotentialState) -> usize {
        self.potential_states
            .iter()
            .filter(|&&state| state == pattern)
            .count()
    }

    /// Index-wise logical or of two states of the same population.
    ///
    /// The time stamp of `self` is kept.
    pub fn union(&self, other: &SimulationState) -> SimulationState {
        assert_eq!(
            self.len(),
            other.len(),
            "Population sizes of combined states differ"
        );
        SimulationState {
            potential_states: self
                .potential_states
                .iter()
                .zip(other.potential_states.iter())
                .map(|(&a, &b)| a | b)
                .collect(),
            time: self.time,
        }
    }
}
