use serde::{Deserialize, Serialize};

use crate::core::{CompartmentSpace, EventType, FiltrationPolicies};
use crate::errors::{CfepiError, Result};
use crate::interventions::{
    DoNothing, FlatReduction, FlatReductionSingleCompartment, SingleTimeMove,
    StrictIncidenceFilter,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "function", content = "parameters", rename_all = "snake_case")]
pub enum EventFilterDefinition {
    #[default]
    DoNothing,
    FlatReduction {
        event_index: usize,
        reduction_percentage: f64,
    },
    FlatReductionSingleCompartment {
        event_index: usize,
        reduction_percentage: f64,
        compartment_to_filter: String,
        index_to_filter: usize,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "function", content = "parameters", rename_all = "snake_case")]
pub enum StateFilterDefinition {
    #[default]
    DoNothing,
    StrictIncidenceFilter {
        compartment: String,
        counts: Vec<usize>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "function", content = "parameters", rename_all = "snake_case")]
pub enum StateModifierDefinition {
    #[default]
    DoNothing,
    SingleTimeMove {
        percent_to_move: f64,
        time: usize,
        source_compartments: Vec<String>,
        destination_compartment: String,
    },
}

/// The policies of one counterfactual world, by name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WorldDefinition {
    #[serde(default)]
    pub event_filter: EventFilterDefinition,
    #[serde(default)]
    pub state_filter: StateFilterDefinition,
    #[serde(default)]
    pub state_modifier: StateModifierDefinition,
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CfepiError::InitializationError(format!(
            "{name} should be within [0, 1], got {value}"
        )))
    }
}

fn check_event_index(event_index: usize, event_types: &[EventType]) -> Result<&EventType> {
    event_types.get(event_index).ok_or_else(|| {
        CfepiError::InitializationError(format!(
            "Event index {event_index} out of range for {} event types",
            event_types.len()
        ))
    })
}

impl WorldDefinition {
    /// Resolve names against the model and check every parameter.
    pub fn build(
        &self,
        compartments: &CompartmentSpace,
        event_types: &[EventType],
    ) -> Result<FiltrationPolicies> {
        let mut policies = FiltrationPolicies::default();

        policies = match &self.event_filter {
            EventFilterDefinition::DoNothing => policies.with_event_filter(DoNothing),
            EventFilterDefinition::FlatReduction {
                event_index,
                reduction_percentage,
            } => {
                check_event_index(*event_index, event_types)?;
                check_fraction("reduction_percentage", *reduction_percentage)?;
                policies.with_event_filter(FlatReduction::new(*event_index, *reduction_percentage))
            }
            EventFilterDefinition::FlatReductionSingleCompartment {
                event_index,
                reduction_percentage,
                compartment_to_filter,
                index_to_filter,
            } => {
                let event_type = check_event_index(*event_index, event_types)?;
                check_fraction("reduction_percentage", *reduction_percentage)?;
                if *index_to_filter >= event_type.arity() {
                    return Err(CfepiError::InitializationError(format!(
                        "Role {index_to_filter} out of range for event type {event_index} with {} roles",
                        event_type.arity()
                    )));
                }
                policies.with_event_filter(FlatReductionSingleCompartment::new(
                    *event_index,
                    *reduction_percentage,
                    compartments.index(compartment_to_filter)?,
                    *index_to_filter,
                ))
            }
        };

        policies = match &self.state_filter {
            StateFilterDefinition::DoNothing => policies.with_state_filter(DoNothing),
            StateFilterDefinition::StrictIncidenceFilter {
                compartment,
                counts,
            } => policies.with_state_filter(StrictIncidenceFilter::new(
                compartments.index(compartment)?,
                counts.clone(),
            )),
        };

        policies = match &self.state_modifier {
            StateModifierDefinition::DoNothing => policies.with_state_modifier(DoNothing),
            StateModifierDefinition::SingleTimeMove {
                percent_to_move,
                time,
                source_compartments,
                destination_compartment,
            } => {
                check_fraction("percent_to_move", *percent_to_move)?;
                policies.with_state_modifier(SingleTimeMove::new(
                    *percent_to_move,
                    *time,
                    compartments.mask(source_compartments)?,
                    compartments.index(destination_compartment)?,
                ))
            }
        };

        Ok(policies)
    }
}
