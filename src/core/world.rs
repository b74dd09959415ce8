//! A single counterfactual world
//!
//! A `FiltrationSetup` holds the committed state of one world, the tentative changes recorded
//! during the current time step and the policies that filter and modify them. Tentative changes
//! are kept in two buffers:
//!
//! - `states_entered`: compartments provisionally gained since the last reset,
//! - `states_remained`: compartments not yet left since the last reset.
//!
//! The tentative next state is the index-wise union of both buffers.

use crate::core::SimRng;
use crate::core::events::{Event, EventType};
use crate::core::policy::{DoNothing, EventFilter, StateFilter, StateModifier};
use crate::core::state::SimulationState;

/// The three policies of a world.
pub struct FiltrationPolicies {
    pub event_filter: Box<dyn EventFilter>,
    pub state_filter: Box<dyn StateFilter>,
    pub state_modifier: Box<dyn StateModifier>,
}

impl FiltrationPolicies {
    pub fn new(
        event_filter: Box<dyn EventFilter>,
        state_filter: Box<dyn StateFilter>,
        state_modifier: Box<dyn StateModifier>,
    ) -> Self {
        Self {
            event_filter,
            state_filter,
            state_modifier,
        }
    }

    pub fn with_event_filter(mut self, event_filter: impl EventFilter + 'static) -> Self {
        self.event_filter = Box::new(event_filter);
        self
    }

    pub fn with_state_filter(mut self, state_filter: impl StateFilter + 'static) -> Self {
        self.state_filter = Box::new(state_filter);
        self
    }

    pub fn with_state_modifier(mut self, state_modifier: impl StateModifier + 'static) -> Self {
        self.state_modifier = Box::new(state_modifier);
        self
    }
}

impl Default for FiltrationPolicies {
    fn default() -> Self {
        Self::new(Box::new(DoNothing), Box::new(DoNothing), Box::new(DoNothing))
    }
}

pub struct FiltrationSetup {
    current_state: SimulationState,
    states_entered: SimulationState,
    states_remained: SimulationState,
    policies: FiltrationPolicies,
}

impl FiltrationSetup {
    pub fn new(initial_state: SimulationState, policies: FiltrationPolicies) -> Self {
        Self {
            states_entered: initial_state.empty_like(),
            states_remained: initial_state.clone(),
            current_state: initial_state,
            policies,
        }
    }

    pub fn current_state(&self) -> &SimulationState {
        &self.current_state
    }

    pub fn states_entered(&self) -> &SimulationState {
        &self.states_entered
    }

    pub fn states_remained(&self) -> &SimulationState {
        &self.states_remained
    }

    /// Union of the tentative buffers.
    pub fn tentative_state(&self) -> SimulationState {
        self.states_entered.union(&self.states_remained)
    }

    /// Commit the pending changes to the current state, then clear them.
    pub fn apply(&mut self) {
        self.current_state = self.tentative_state();
        self.reset();
    }

    /// Replace the current state by an externally completed next state, then clear the pending
    /// changes.
    pub fn commit(&mut self, state: SimulationState) {
        self.current_state = state;
        self.reset();
    }

    /// Discard the pending changes.
    pub fn reset(&mut self) {
        self.states_entered = self.current_state.empty_like();
        self.states_remained.clone_from(&self.current_state);
    }

    pub fn keep_event(&self, event: &Event, rng: &mut SimRng) -> bool {
        self.policies
            .event_filter
            .keep(event, &self.current_state, rng)
    }

    pub fn accept_state(&self, candidate: &SimulationState, rng: &mut SimRng) -> bool {
        self.policies.state_filter.accept(self, candidate, rng)
    }

    pub fn modify_state(&self, state: &mut SimulationState, rng: &mut SimRng) {
        self.policies.state_modifier.modify(state, rng)
    }

    /// Record `event` in the tentative buffers.
    ///
    /// The event is discarded when its preconditions do not hold in this world's committed state,
    /// or when it would move an individual that has already been moved during this step. Returns
    /// whether the event was recorded.
    pub fn record(&mut self, event_type: &EventType, event: &Event) -> bool {
        let participants = &event.participants;
        if !event_type.check_preconditions(&self.current_state, participants) {
            return false;
        }
        if event_type.conflicts(&self.states_entered, participants) {
            return false;
        }
        event_type.apply_entered(&mut self.states_entered, participants);
        event_type.apply_left(&mut self.states_remained, &self.current_state, participants);
        true
    }
}
