use rand::Rng;

use crate::core::{PotentialState, SimRng, SimulationState, StateModifier};

/// Move a random fraction of the individuals in `sources` to `destination` once, at `time`.
///
/// One uniform draw is consumed for every individual of the population, whether or not it is in
/// a source compartment.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleTimeMove {
    percent_to_move: f64,
    time: usize,
    sources: PotentialState,
    destination: usize,
}

impl SingleTimeMove {
    pub fn new(
        percent_to_move: f64,
        time: usize,
        sources: PotentialState,
        destination: usize,
    ) -> Self {
        Self {
            percent_to_move,
            time,
            sources,
            destination,
        }
    }
}

impl StateModifier for SingleTimeMove {
    fn modify(&self, state: &mut SimulationState, rng: &mut SimRng) {
        if state.time() != self.time {
            return;
        }
        let mut moved = 0usize;
        for potential_state in state.iter_mut() {
            if rng.random::<f64>() < self.percent_to_move && potential_state.intersects(self.sources)
            {
                *potential_state = PotentialState::single(self.destination);
                moved += 1;
            }
        }
        log::debug!(
            "Moved {moved} individuals to compartment {} at time {}",
            self.destination,
            self.time
        );
    }
}
