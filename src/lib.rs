pub mod args;
#[macro_use]
pub mod core;
pub mod config;
pub mod errors;
pub mod interventions;
pub mod readwrite;
pub mod runner;
pub mod simulation;
pub mod stats;
