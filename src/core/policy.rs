//! Policy callbacks of a world.
//!
//! Every world is parameterized by three policies:
//!
//! 1. `EventFilter`: Decide whether a sampled event is kept in the world.
//! 2. `StateFilter`: Accept or reject the tentative next state of the world. A single rejection
//!    discards the time step for all worlds.
//! 3. `StateModifier`: Modify the tentative next state in place, e.g. to apply interventions.
//!
//! All policies draw randomness exclusively from the generator they are handed, so that a run is
//! reproducible from its seed. Closures with matching signatures implement the traits.
use crate::core::SimRng;
use crate::core::events::Event;
use crate::core::state::SimulationState;
use crate::core::world::FiltrationSetup;

pub trait EventFilter {
    /// Return `true` to keep `event` in a world whose committed state is `state`.
    fn keep(&self, event: &Event, state: &SimulationState, rng: &mut SimRng) -> bool;
}

pub trait StateFilter {
    /// Return `true` to accept `candidate` as the next state of `world`.
    fn accept(&self, world: &FiltrationSetup, candidate: &SimulationState, rng: &mut SimRng)
    -> bool;
}

pub trait StateModifier {
    /// Modify the tentative next state in place.
    fn modify(&self, state: &mut SimulationState, rng: &mut SimRng);
}

/// Pass-through policy: keeps every event, accepts every state and modifies nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DoNothing;

impl EventFilter for DoNothing {
    fn keep(&self, _event: &Event, _state: &SimulationState, _rng: &mut SimRng) -> bool {
        true
    }
}

impl StateFilter for DoNothing {
    fn accept(
        &self,
        _world: &FiltrationSetup,
        _candidate: &SimulationState,
        _rng: &mut SimRng,
    ) -> bool {
        true
    }
}

impl StateModifier for DoNothing {
    fn modify(&self, _state: &mut SimulationState, _rng: &mut SimRng) {}
}

impl<F> EventFilter for F
where
    F: Fn(&Event, &SimulationState, &mut SimRng) -> bool,
{
    fn keep(&self, event: &Event, state: &SimulationState, rng: &mut SimRng) -> bool {
        self(event, state, rng)
    }
}

impl<F> StateFilter for F
where
    F: Fn(&FiltrationSetup, &SimulationState, &mut SimRng) -> bool,
{
    fn accept(
        &self,
        world: &FiltrationSetup,
        candidate: &SimulationState,
        rng: &mut SimRng,
    ) -> bool {
        self(world, candidate, rng)
    }
}

impl<F> StateModifier for F
where
    F: Fn(&mut SimulationState, &mut SimRng),
{
    fn modify(&self, state: &mut SimulationState, rng: &mut SimRng) {
        self(state, rng)
    }
}
