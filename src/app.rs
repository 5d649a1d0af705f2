//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments into run configurations
//! - runs the shared workflows in `pipeline`
//! - prints reports

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, RangeArgs, SimulateArgs, UnfoldArgs};
use crate::data::SyntheticConfig;
use crate::domain::{BinWindow, FitRunConfig, MultRange, ResponseParams, UnfoldRunConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `scone` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init(crate::logging::level_for(cli.verbose, cli.quiet));

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Unfold(args) => handle_unfold(&args),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;
    println!("{}", crate::report::format_fit_summary(&run.curves, &run.fitted));
    Ok(())
}

fn handle_unfold(args: &UnfoldArgs) -> Result<(), AppError> {
    let config = unfold_config_from_args(args)?;
    let run = pipeline::run_unfold(&config)?;
    println!("{}", crate::report::format_calibration(&run.calibration));
    println!(
        "{}",
        crate::report::format_unfolded_table(&run.unfolded, run.calibration.energy_half_width)
    );
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        params: ResponseParams { a: args.a, b: args.b },
        max_emitted: args.max_emitted,
        events_per_bin: args.events_per_bin,
        seed: args.seed,
    };
    let n = pipeline::run_simulate(&config, &args.out)?;
    println!("Wrote {n} histogram entries to {}", args.out.display());
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitRunConfig, AppError> {
    Ok(FitRunConfig {
        references: args.references.clone(),
        mult_range: mult_range_from_args(&args.range)?,
        max_iterations: args.range.max_iterations,
        export_calibration: args.export_calibration.clone(),
        constants_path: args.constants.clone(),
    })
}

pub fn unfold_config_from_args(args: &UnfoldArgs) -> Result<UnfoldRunConfig, AppError> {
    if args.bins == 0 {
        return Err(AppError::config("`--bins` must be > 0."));
    }
    Ok(UnfoldRunConfig {
        measurement: args.measurement.clone(),
        secondary: args.secondary.clone(),
        split: args.split.unwrap_or(0),
        window: BinWindow {
            first: args.first_bin,
            count: Some(args.bins),
        },
        nubar: args.nubar.clone(),
        calibration: args.calibration.clone(),
        references: args.references.clone(),
        mult_range: mult_range_from_args(&args.range)?,
        max_iterations: args.range.max_iterations,
        output: args.output.clone(),
    })
}

fn mult_range_from_args(args: &RangeArgs) -> Result<Option<MultRange>, AppError> {
    match (args.mult_min, args.mult_max) {
        (Some(low), Some(high)) => MultRange::new(low, high).map(Some).ok_or_else(|| {
            AppError::config(format!(
                "Invalid multiplicity range [{low}, {high}] (need finite low <= high)."
            ))
        }),
        (None, None) => Ok(None),
        _ => Err(AppError::config("`--mult-min` and `--mult-max` must be given together.")),
    }
}
