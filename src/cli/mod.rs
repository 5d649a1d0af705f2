//! Command-line parsing for the SCONE multiplicity unfolder.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! numerical code: flags are turned into run configurations in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "scone", version, about = "SCONE gamma-multiplicity response fitting and unfolding")]
pub struct Cli {
    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the response constants (a, b) on reference simulation histograms.
    Fit(FitArgs),
    /// Unfold a measured multiplicity series.
    Unfold(UnfoldArgs),
    /// Generate a synthetic reference histogram from known constants.
    Simulate(SimulateArgs),
}

/// Emitted-multiplicity range shared by `fit` and `unfold`.
#[derive(Debug, Args, Clone, Default)]
pub struct RangeArgs {
    /// Lowest emitted multiplicity kept for fitting (inclusive).
    #[arg(long, requires = "mult_max")]
    pub mult_min: Option<f64>,

    /// Highest emitted multiplicity kept for fitting (inclusive).
    #[arg(long, requires = "mult_min")]
    pub mult_max: Option<f64>,

    /// Iteration cap of the fitter (defaults: 500 single, 20000 joint).
    #[arg(long = "max-iter")]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Reference histogram (emitted detected count). Repeat for a joint fit.
    #[arg(long = "reference", value_name = "FILE", required = true, num_args = 1..)]
    pub references: Vec<PathBuf>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Static constants (JSON) carried into the exported calibration.
    #[arg(long, value_name = "JSON")]
    pub constants: Option<PathBuf>,

    /// Write the fitted calibration to JSON.
    #[arg(long = "export-calibration", value_name = "JSON")]
    pub export_calibration: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct UnfoldArgs {
    /// Measurement histogram (energy detected count).
    #[arg(long, value_name = "FILE")]
    pub measurement: PathBuf,

    /// Second measurement of the same energy grid (e.g. another gate width).
    #[arg(long, value_name = "FILE", requires = "split")]
    pub secondary: Option<PathBuf>,

    /// Points before this index come from `--measurement`, the rest from `--secondary`.
    #[arg(long, requires = "secondary")]
    pub split: Option<usize>,

    /// Average prompt-neutron multiplicity table, index-aligned with the measurement.
    #[arg(long, value_name = "FILE")]
    pub nubar: PathBuf,

    /// Calibration JSON (constants). Built-in constants are used when absent.
    #[arg(long, value_name = "JSON")]
    pub calibration: Option<PathBuf>,

    /// Fit the response on these reference histograms instead of using static constants.
    #[arg(long = "reference", value_name = "FILE", num_args = 1..)]
    pub references: Vec<PathBuf>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// First measurement bin kept (the lowest bin is below threshold).
    #[arg(long, default_value_t = 1)]
    pub first_bin: usize,

    /// Number of bins kept.
    #[arg(long, default_value_t = 30)]
    pub bins: usize,

    /// Write `energy g_mult g_mult_err` to this file.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Response asymptote.
    #[arg(long)]
    pub a: f64,

    /// Response curvature scale.
    #[arg(long)]
    pub b: f64,

    /// Output histogram file.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Largest emitted multiplicity simulated.
    #[arg(long, default_value_t = 40)]
    pub max_emitted: u32,

    /// Simulated events per emitted multiplicity.
    #[arg(long, default_value_t = 2000)]
    pub events_per_bin: u32,

    /// RNG seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
