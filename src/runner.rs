use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::error::Error;

use crate::args::Args;
use crate::config::Settings;
use crate::core::{AggregatedState, CompartmentSpace};
use crate::readwrite::{CsvHistoryWriter, HistoryWriter};
use crate::simulation::{Simulation, SimulationResult};
use crate::stats::CompartmentTotals;

pub struct Runner {
    args: Args,
    compartments: CompartmentSpace,
    simulation: Simulation,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner, Box<dyn Error>> {
        Self::setup_logger(&args);
        Self::setup_rayon(&args);

        let mut settings = Self::load_settings(&args.settings)?;
        if let Some(max_resets) = args.max_resets {
            log::info!("Overriding maximum resets per step with {max_resets}");
            settings.max_resets = Some(max_resets);
        }

        let scenario = settings.build()?;
        let compartments = scenario.compartments.clone();
        let simulation = scenario.into_simulation(args.duration, args.seed)?;

        Ok(Self {
            args,
            compartments,
            simulation,
        })
    }

    pub fn start(self) -> Result<(), Box<dyn Error>> {
        let Runner {
            args,
            compartments,
            simulation,
        } = self;
        log::info!("Starting simulation {} with seed {}", args.name, args.seed);
        let result = Self::run(&args, &compartments, simulation)?;
        Self::finish(&args, &compartments, &result)?;
        Ok(())
    }

    fn finish(
        args: &Args,
        compartments: &CompartmentSpace,
        result: &SimulationResult,
    ) -> Result<(), Box<dyn Error>> {
        log::info!("Storing time series...");
        let writer = CsvHistoryWriter::new(&args.outdir, compartments)?;
        writer.write(result)?;
        log::info!("Finished storing time series.");
        Ok(())
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Setup rayon thread pool
    #[cfg(feature = "parallel")]
    fn setup_rayon(args: &Args) {
        if let Some(n_threads) = args.threads {
            println!("Setting number of threads to {}.", n_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build_global()
                .unwrap_or_else(|_| {
                    eprintln!("Unable to set number of threads.");
                    std::process::exit(1);
                });
        }
    }

    /// Without the `parallel` feature there is no pool to size.
    #[cfg(not(feature = "parallel"))]
    fn setup_rayon(args: &Args) {
        if let Some(message) = Self::ignored_threads(args) {
            eprintln!("{message}");
            log::warn!("{message}");
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn ignored_threads(args: &Args) -> Option<String> {
        args.threads.map(|n_threads| {
            format!("Ignoring --threads {n_threads}: built without the `parallel` feature.")
        })
    }

    /// Load settings from file
    fn load_settings(path: &str) -> Result<Settings, Box<dyn Error>> {
        let settings: Settings = Settings::read_from_file(path)?;
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    /// Compartment totals of every world, e.g. `[S=990 I=10 R=0]`.
    fn describe(compartments: &CompartmentSpace, aggregated: &[AggregatedState]) -> String {
        aggregated
            .iter()
            .map(|world| {
                let totals = world.totals(compartments.size());
                format!(
                    "[{}]",
                    compartments
                        .names()
                        .iter()
                        .zip(totals)
                        .map(|(name, total)| format!("{name}={total}"))
                        .join(" ")
                )
            })
            .join(" ")
    }

    fn run(
        args: &Args,
        compartments: &CompartmentSpace,
        simulation: Simulation,
    ) -> Result<SimulationResult, Box<dyn Error>> {
        let bar = match args.disable_progress_bar {
            true => None,
            false => {
                let bar = ProgressBar::new(args.duration as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}",
                        )?
                        .progress_chars("=> "),
                );
                Some(bar)
            }
        };

        let initial = simulation.aggregate_worlds();
        log::info!(
            "time=0 totals={}",
            Self::describe(compartments, &initial)
        );

        let result = simulation.run_with(|time, aggregated| {
            let totals = Self::describe(compartments, aggregated);
            log::debug!("time={time} totals={totals}");
            if let Some(bar) = bar.as_ref() {
                bar.set_position(time as u64);
                bar.set_message(totals);
            }
        })?;

        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
        log::info!(
            "Finished simulation with {} resets over {} steps.",
            result.resets,
            result.resets_per_step.len()
        );
        Ok(result)
    }
}
