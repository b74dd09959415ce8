//! Writers for simulated time series.

mod history;

pub use history::{CsvHistoryWriter, HistoryWriter};
