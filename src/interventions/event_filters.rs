use rand::Rng;

use crate::core::{Event, EventFilter, SimRng, SimulationState};

/// Drop a fixed fraction of the events of one event type.
///
/// A uniform draw is consumed only for events of the targeted type.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatReduction {
    event_index: usize,
    reduction_percentage: f64,
}

impl FlatReduction {
    pub fn new(event_index: usize, reduction_percentage: f64) -> Self {
        Self {
            event_index,
            reduction_percentage,
        }
    }
}

impl EventFilter for FlatReduction {
    fn keep(&self, event: &Event, _state: &SimulationState, rng: &mut SimRng) -> bool {
        if event.event_type != self.event_index {
            return true;
        }
        rng.random::<f64>() >= self.reduction_percentage
    }
}

/// Drop a fixed fraction of the events of one event type whose participant in role `role` is
/// currently in `compartment`.
///
/// A uniform draw is consumed only for events that match both conditions.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatReductionSingleCompartment {
    event_index: usize,
    reduction_percentage: f64,
    compartment: usize,
    role: usize,
}

impl FlatReductionSingleCompartment {
    pub fn new(
        event_index: usize,
        reduction_percentage: f64,
        compartment: usize,
        role: usize,
    ) -> Self {
        Self {
            event_index,
            reduction_percentage,
            compartment,
            role,
        }
    }
}

impl EventFilter for FlatReductionSingleCompartment {
    fn keep(&self, event: &Event, state: &SimulationState, rng: &mut SimRng) -> bool {
        if event.event_type != self.event_index {
            return true;
        }
        match event.role(self.role) {
            Some(individual) if state[individual].contains(self.compartment) => {
                rng.random::<f64>() >= self.reduction_percentage
            }
            _ => true,
        }
    }
}
