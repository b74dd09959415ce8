use std::collections::BTreeMap;

use crate::core::{CompartmentSpace, EventType, FiltrationPolicies, PotentialState, SimulationState};
use crate::errors::{CfepiError, Result};
use crate::simulation::{RetryPolicy, Simulation};

/// Everything needed to start a simulation, resolved from settings.
pub struct Scenario {
    pub compartments: CompartmentSpace,
    pub event_types: Vec<EventType>,
    pub probabilities: Vec<f64>,
    pub initial_state: SimulationState,
    pub policies: Vec<FiltrationPolicies>,
    pub retry_policy: RetryPolicy,
}

impl Scenario {
    pub fn into_simulation(self, duration: usize, seed: u64) -> Result<Simulation> {
        Ok(Simulation::new(
            self.event_types,
            &self.probabilities,
            self.initial_state,
            self.policies,
            duration,
            seed,
        )?
        .with_retry_policy(self.retry_policy))
    }
}

/// Lay out the initial population in compartment order.
pub fn initial_state(
    compartments: &CompartmentSpace,
    initial_conditions: &BTreeMap<String, usize>,
) -> Result<SimulationState> {
    for name in initial_conditions.keys() {
        if compartments.index(name).is_err() {
            return Err(CfepiError::InitializationError(format!(
                "Initial conditions refer to unknown compartment {name}"
            )));
        }
    }

    let mut states = Vec::with_capacity(compartments.size());
    for (index, name) in compartments.names().iter().enumerate() {
        match initial_conditions.get(name) {
            Some(&count) => {
                states.push(SimulationState::uniform(PotentialState::single(index), count))
            }
            None => log::warn!("No initial condition for compartment {name}, starting empty"),
        }
    }
    Ok(states.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_compartment_order() {
        let space = CompartmentSpace::new(&["S", "I", "R"]).unwrap();
        let conditions = BTreeMap::from([("I".to_string(), 2), ("S".to_string(), 3)]);
        let state = initial_state(&space, &conditions).unwrap();

        assert_eq!(state.len(), 5);
        assert!(state.is_committed());
        assert_eq!(state[0], PotentialState::single(0));
        assert_eq!(state[2], PotentialState::single(0));
        assert_eq!(state[3], PotentialState::single(1));
        assert_eq!(state.count_pattern(PotentialState::single(2)), 0);
    }

    #[test]
    fn unknown_compartment() {
        let space = CompartmentSpace::new(&["S", "I"]).unwrap();
        let conditions = BTreeMap::from([("X".to_string(), 2)]);
        assert!(matches!(
            initial_state(&space, &conditions),
            Err(CfepiError::InitializationError(_))
        ));
    }
}
