//! Catalog of named world policies.
//!
//! The configuration layer resolves policy names to these implementations. `DoNothing` from the
//! core module is the pass-through entry of every catalog.

mod event_filters;
mod state_filters;
mod state_modifiers;

pub use crate::core::DoNothing;
pub use event_filters::{FlatReduction, FlatReductionSingleCompartment};
pub use state_filters::StrictIncidenceFilter;
pub use state_modifiers::SingleTimeMove;
