//! Settings module.

use super::model::ModelField;
use super::scenario::{Scenario, initial_state};
use super::worlds::WorldDefinition;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::core::FiltrationPolicies;
use crate::errors::Result;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Name of a built-in model or an inline model definition.
    pub model: ModelField,

    /// Number of individuals initially in each compartment.
    pub initial_conditions: BTreeMap<String, usize>,

    /// Maximum number of resets of a single time step. Unbounded if missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resets: Option<usize>,

    /// One entry per counterfactual world.
    pub worlds: Vec<WorldDefinition>,
}

#[derive(Debug)]
pub enum SettingsError {
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
}

impl std::error::Error for SettingsError {}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::IoError(error) => write!(formatter, "IO error: {}", error),
            SettingsError::YamlError(error) => write!(formatter, "YAML error: {}", error),
        }
    }
}

impl std::fmt::Display for Settings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        let output = String::from_utf8(output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", output)
    }
}

impl Settings {
    pub fn write(&self, writer: &mut dyn std::io::Write) -> std::result::Result<(), SettingsError> {
        serde_yaml::to_writer(writer, self).map_err(SettingsError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> std::result::Result<Settings, SettingsError> {
        serde_yaml::from_reader(reader).map_err(SettingsError::YamlError)
    }

    pub fn write_to_file(&self, filename: &str) -> std::result::Result<(), SettingsError> {
        let file = fs::File::create(filename).map_err(SettingsError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> std::result::Result<Settings, SettingsError> {
        let file = fs::File::open(filename).map_err(SettingsError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Resolve the model, the initial population and all world policies.
    pub fn build(&self) -> Result<Scenario> {
        let population = self.initial_conditions.values().sum();
        let model = self.model.definition()?.build(population)?;
        let initial_state = initial_state(&model.compartments, &self.initial_conditions)?;
        let policies = self
            .worlds
            .iter()
            .map(|world| world.build(&model.compartments, &model.event_types))
            .collect::<Result<Vec<FiltrationPolicies>>>()?;

        log::info!(
            "Loaded model with compartments [{}], {} event types and {} worlds",
            model.compartments.names().join(", "),
            model.event_types.len(),
            policies.len()
        );

        Ok(Scenario {
            compartments: model.compartments,
            event_types: model.event_types,
            probabilities: model.probabilities,
            initial_state,
            policies,
            retry_policy: self.max_resets.into(),
        })
    }
}
