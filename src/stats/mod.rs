//! Statistics and metric trait implementations

pub mod compartments;

pub use compartments::CompartmentTotals;
