use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None, name = "cfepi")]
pub struct Args {
    /// Path to settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Directory for the per-world time series.
    #[clap(long, short)]
    pub outdir: String,

    /// Number of time steps to simulate.
    #[clap(short, long, default_value_t = 365)]
    pub duration: usize,

    /// Seed of the shared random number generator.
    #[clap(long, default_value_t = 2)]
    pub seed: u64,

    /// Name of the simulation run.
    #[clap(long, default_value = "cfepi")]
    pub name: String,

    /// Path to log file.
    #[clap(long, default_value = "cfepi.log")]
    pub log_file: String,

    /// Increase logging verbosity (debug, trace).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not show a progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,

    /// Number of threads (requires the `parallel` feature).
    #[clap(long)]
    pub threads: Option<usize>,

    /// Maximum resets of a single time step, overrides the settings.
    #[clap(long)]
    pub max_resets: Option<usize>,
}
