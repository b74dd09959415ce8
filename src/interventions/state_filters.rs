use crate::core::{FiltrationSetup, PotentialState, SimRng, SimulationState, StateFilter};

/// Pin the daily incidence of one compartment to a target series.
///
/// A tentative state stamped with time `t` is accepted only if exactly `counts[t]` individuals
/// entered `compartment` during the step. Past the end of the target series every state is
/// accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct StrictIncidenceFilter {
    compartment: usize,
    counts: Vec<usize>,
}

impl StrictIncidenceFilter {
    pub fn new(compartment: usize, counts: Vec<usize>) -> Self {
        Self {
            compartment,
            counts,
        }
    }

    pub fn horizon(&self) -> usize {
        self.counts.len()
    }
}

impl StateFilter for StrictIncidenceFilter {
    fn accept(
        &self,
        world: &FiltrationSetup,
        candidate: &SimulationState,
        _rng: &mut SimRng,
    ) -> bool {
        match self.counts.get(candidate.time()) {
            Some(&target) => {
                let incidence = world
                    .states_entered()
                    .count_pattern(PotentialState::single(self.compartment));
                incidence == target
            }
            None => true,
        }
    }
}
