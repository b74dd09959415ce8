use evalexpr::{DefaultNumericTypes, Value, context_map};
use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::core::{CompartmentSpace, EventType, PotentialState};
use crate::errors::{CfepiError, Result};

/// Built-in compartmental models, keyed by the name used in the settings file.
pub static MODELS: phf::Map<&'static str, &'static str> = phf_map! {
    "sir" => SIR,
    "sirv" => SIRV,
    "seiiir" => SEIIIR,
};

const SIR: &str = r#"
compartments: [S, I, R]
events:
  - source: [[I]]
    destination: [{index: 0, compartment: R}]
    rate: "1 / 2.25"
  - source: [[I], [S]]
    destination: [{index: 1, compartment: I}]
    rate: "1.75 / 2.25 / population"
"#;

const SIRV: &str = r#"
compartments: [S, I, R, V]
events:
  - source: [[I]]
    destination: [{index: 0, compartment: R}]
    rate: "1 / 2.25"
  - source: [[I], [S, V]]
    destination: [{index: 1, compartment: I}]
    rate: "1.75 / 2.25 / population"
"#;

const SEIIIR: &str = r#"
compartments: [S, E, I1, I2, I3, R]
events:
  - source: [[E]]
    destination: [{index: 0, compartment: I1}]
    rate: "1 / 5.2"
  - source: [[I1]]
    destination: [{index: 0, compartment: I2}]
    rate: 0.75
  - source: [[I2]]
    destination: [{index: 0, compartment: I3}]
    rate: 0.75
  - source: [[I3]]
    destination: [{index: 0, compartment: R}]
    rate: 0.75
  - source: [[I1, I2, I3], [S]]
    destination: [{index: 1, compartment: E}]
    rate: "2.3 * 0.25 / population"
"#;

/// A per-step event probability, either literal or an arithmetic expression in `population`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Rate {
    Value(f64),
    Expression(String),
}

impl Rate {
    pub fn evaluate(&self, population: usize) -> Result<f64> {
        match self {
            Rate::Value(value) => Ok(*value),
            Rate::Expression(expression) => {
                let context = context_map! {
                    "population" => Value::<DefaultNumericTypes>::Float(population as f64),
                }
                .map_err(|error| CfepiError::ImplementationError(error.to_string()))?;
                evalexpr::eval_number_with_context(expression.as_str(), &context).map_err(
                    |error| {
                        CfepiError::InitializationError(format!(
                            "Invalid rate `{expression}`: {error}"
                        ))
                    },
                )
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DestinationDefinition {
    /// Role of the participant that moves.
    pub index: usize,
    pub compartment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventDefinition {
    /// Admissible compartments for every role.
    pub source: Vec<Vec<String>>,
    #[serde(default)]
    pub destination: Vec<DestinationDefinition>,
    pub rate: Rate,
}

impl EventDefinition {
    pub fn build(&self, compartments: &CompartmentSpace) -> Result<EventType> {
        let preconditions = self
            .source
            .iter()
            .map(|names| compartments.mask(names))
            .collect::<Result<Vec<PotentialState>>>()?;

        let mut postconditions = vec![None; preconditions.len()];
        for destination in self.destination.iter() {
            let role = postconditions.get_mut(destination.index).ok_or_else(|| {
                CfepiError::InitializationError(format!(
                    "Destination role {} out of range for an event with {} roles",
                    destination.index,
                    preconditions.len()
                ))
            })?;
            if role.is_some() {
                return Err(CfepiError::InitializationError(format!(
                    "Destination role {} given more than once",
                    destination.index
                )));
            }
            *role = Some(compartments.index(&destination.compartment)?);
        }

        EventType::new(preconditions, postconditions)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    #[serde(alias = "states")]
    pub compartments: Vec<String>,
    pub events: Vec<EventDefinition>,
}

/// A compiled model: compartment space, event types and their per-step probabilities.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub compartments: CompartmentSpace,
    pub event_types: Vec<EventType>,
    pub probabilities: Vec<f64>,
}

impl ModelDefinition {
    pub fn from_preset(name: &str) -> Result<Self> {
        let definition = MODELS.get(name).ok_or_else(|| {
            CfepiError::InitializationError(format!(
                "Unknown model `{name}`, expected one of: {}",
                MODELS.keys().copied().collect::<Vec<_>>().join(", ")
            ))
        })?;
        serde_yaml::from_str(definition)
            .map_err(|error| CfepiError::ImplementationError(error.to_string()))
    }

    pub fn build(&self, population: usize) -> Result<Model> {
        let compartments = CompartmentSpace::new(&self.compartments)?;
        let event_types = self
            .events
            .iter()
            .map(|event| event.build(&compartments))
            .collect::<Result<Vec<EventType>>>()?;
        let probabilities = self
            .events
            .iter()
            .map(|event| event.rate.evaluate(population))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Model {
            compartments,
            event_types,
            probabilities,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ModelField {
    Preset(String),
    Definition(ModelDefinition),
}

impl ModelField {
    pub fn definition(&self) -> Result<ModelDefinition> {
        match self {
            ModelField::Preset(name) => ModelDefinition::from_preset(name),
            ModelField::Definition(definition) => Ok(definition.clone()),
        }
    }
}
