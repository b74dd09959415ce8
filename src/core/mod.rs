//! This module contains the core datatypes of the library.

mod aggregate;
mod world;

#[macro_use]
pub mod state;
pub mod compartments;
pub mod events;
pub mod policy;
pub mod sampler;

pub use aggregate::{AggregatedState, aggregate};
pub use compartments::CompartmentSpace;
pub use events::{Candidates, Event, EventType, Participants};
pub use policy::{DoNothing, EventFilter, StateFilter, StateModifier};
pub use sampler::ProbabilisticSampler;
pub use state::{PotentialState, SimulationState};
pub use world::{FiltrationPolicies, FiltrationSetup};

/// Deterministic generator shared by all worlds of a run.
pub type SimRng = rand_chacha::ChaCha20Rng;
