//! Named, indexable set of mutually exclusive disease compartments.

use std::collections::HashMap;

use crate::core::state::PotentialState;
use crate::errors::{CfepiError, Result};

/// Maximum number of compartments, bounded by the width of `PotentialState`.
pub const MAX_COMPARTMENTS: usize = 64;

/// A fixed list of compartment names with a bidirectional name/index lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct CompartmentSpace {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl CompartmentSpace {
    /// Construct a compartment space from an ordered list of names.
    ///
    /// The position of each name in the list becomes its bit index.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(CfepiError::InitializationError(
                "At least one compartment is required".to_string(),
            ));
        }
        if names.len() > MAX_COMPARTMENTS {
            return Err(CfepiError::InitializationError(format!(
                "At most {MAX_COMPARTMENTS} compartments are supported, got {}",
                names.len()
            )));
        }

        let mut indices = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if indices.insert(name.as_ref().to_string(), index).is_some() {
                return Err(CfepiError::InitializationError(format!(
                    "Compartment {} is defined more than once",
                    name.as_ref()
                )));
            }
        }

        Ok(Self {
            names: names.iter().map(|name| name.as_ref().to_string()).collect(),
            indices,
        })
    }

    pub fn size(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look up the index of a compartment by name.
    pub fn index(&self, name: &str) -> Result<usize> {
        self.indices.get(name).copied().ok_or_else(|| {
            CfepiError::InitializationError(format!("No compartment named {name}"))
        })
    }

    /// Look up the name of a compartment by index.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Single-bit pattern of the named compartment.
    pub fn single(&self, name: &str) -> Result<PotentialState> {
        Ok(PotentialState::single(self.index(name)?))
    }

    /// Union mask of all named compartments.
    pub fn mask<S: AsRef<str>>(&self, names: &[S]) -> Result<PotentialState> {
        names.iter().try_fold(PotentialState::empty(), |mask, name| {
            Ok(mask | self.single(name.as_ref())?)
        })
    }

    /// Human readable label of a bit pattern, e.g. `S+V`.
    pub fn label(&self, pattern: PotentialState) -> String {
        pattern
            .indices()
            .map(|index| self.name(index).unwrap_or("?"))
            .collect::<Vec<&str>>()
            .join("+")
    }
}
