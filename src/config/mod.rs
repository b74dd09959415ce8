//! Configuration data structures for simulation setups.

mod model;
mod scenario;
mod settings;
mod worlds;

pub use model::{
    DestinationDefinition, EventDefinition, MODELS, Model, ModelDefinition, ModelField, Rate,
};
pub use scenario::{Scenario, initial_state};
pub use settings::{Settings, SettingsError};
pub use worlds::{
    EventFilterDefinition, StateFilterDefinition, StateModifierDefinition, WorldDefinition,
};
