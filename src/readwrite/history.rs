use serde::Serialize;
use std::{fs, io, path::Path};

use crate::core::{AggregatedState, CompartmentSpace};
use crate::simulation::SimulationResult;

pub trait HistoryWriter {
    fn write_world(&self, world: usize, series: &[AggregatedState]) -> io::Result<()>;
    fn write_resets(&self, resets_per_step: &[usize]) -> io::Result<()>;

    fn write(&self, result: &SimulationResult) -> io::Result<()> {
        for (world, series) in result.series.iter().enumerate() {
            self.write_world(world, series)?;
        }
        self.write_resets(&result.resets_per_step)
    }
}

#[derive(Serialize)]
struct HistoryRecord<'a> {
    step: usize,
    time: usize,
    pattern: &'a str,
    count: usize,
}

#[derive(Serialize)]
struct ResetRecord {
    step: usize,
    resets: usize,
}

/// Long-format CSV output, one `world_<k>.csv` per world and a `resets.csv`.
pub struct CsvHistoryWriter<'a> {
    path: &'a str,
    compartments: &'a CompartmentSpace,
}

impl<'a> CsvHistoryWriter<'a> {
    pub fn new(path: &'a str, compartments: &'a CompartmentSpace) -> io::Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self { path, compartments })
    }

    pub fn world_path(&self, world: usize) -> std::path::PathBuf {
        Path::new(self.path).join(format!("world_{world}.csv"))
    }

    pub fn resets_path(&self) -> std::path::PathBuf {
        Path::new(self.path).join("resets.csv")
    }
}

impl HistoryWriter for CsvHistoryWriter<'_> {
    fn write_world(&self, world: usize, series: &[AggregatedState]) -> io::Result<()> {
        let path = self.world_path(world);
        log::info!("Writing history of world {world} to {}", path.display());
        let mut writer = csv::WriterBuilder::new().from_path(path)?;
        for (step, aggregated) in series.iter().enumerate() {
            for (pattern, count) in aggregated.iter() {
                let label = self.compartments.label(pattern);
                writer.serialize(HistoryRecord {
                    step,
                    time: aggregated.time(),
                    pattern: &label,
                    count,
                })?;
            }
        }
        writer.flush()
    }

    fn write_resets(&self, resets_per_step: &[usize]) -> io::Result<()> {
        let mut writer = csv::WriterBuilder::new().from_path(self.resets_path())?;
        for (step, &resets) in resets_per_step.iter().enumerate() {
            writer.serialize(ResetRecord {
                step: step + 1,
                resets,
            })?;
        }
        writer.flush()
    }
}
