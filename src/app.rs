//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the run configuration (file, then flag overrides)
//! - runs the fit pipeline
//! - prints the summary and where the outputs went

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, FitArgs, SummaryArgs};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::io::{default_config_json, label_from_sampler_path, load_sampler, read_config_json};
use crate::plot::render_ascii_sed;
use crate::report::{format_results_table, format_run_summary, summarize_parameters};

pub mod pipeline;

/// Entry point for the `sedfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Summary(args) => handle_summary(&args),
        Command::Config => handle_config(),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let base = match &args.config {
        Some(path) => read_config_json(path)?,
        None => RunConfig::default(),
    };
    let config = run_config_from_args(base, args);
    info!("Starting fit '{}'", config.label);

    let run = pipeline::run(&config)?;

    println!("{}", format_run_summary(&config.label, &run.state));
    println!("{}", format_results_table(&run.summary));
    if let Some(plot) = &run.ascii {
        println!("{plot}");
    }
    println!("Sampler: {}", run.sampler_path.display());
    println!("Results: {}", run.results_path.display());
    if !run.plots.is_empty() {
        println!("Plots:   {} files in {}", run.plots.len(), config.output_dir.display());
    }
    Ok(())
}

fn handle_summary(args: &SummaryArgs) -> Result<(), AppError> {
    let state = load_sampler(&args.path)?;
    let label = label_from_sampler_path(&args.path).unwrap_or("sampler");

    println!("{}", format_run_summary(label, &state));
    println!("{}", format_results_table(&summarize_parameters(&state, true, true)));
    println!("{}", render_ascii_sed(&state.data, &[], args.width, args.height));
    Ok(())
}

fn handle_config() -> Result<(), AppError> {
    println!("{}", default_config_json()?);
    Ok(())
}

/// Apply command-line overrides on top of `config`.
pub fn run_config_from_args(mut config: RunConfig, args: &FitArgs) -> RunConfig {
    if let Some(path) = &args.xray {
        config.xray_path = path.clone();
    }
    if let Some(path) = &args.vhe {
        config.vhe_path = path.clone();
    }
    if let Some(label) = &args.label {
        config.label = label.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(n) = args.walkers {
        config.sampler.n_walkers = n;
    }
    if let Some(n) = args.burn {
        config.sampler.n_burn = n;
    }
    if let Some(n) = args.run {
        config.sampler.n_run = n;
    }
    if let Some(n) = args.threads {
        config.sampler.threads = n;
    }
    if let Some(seed) = args.seed {
        config.sampler.seed = seed;
    }
    if args.no_plots {
        config.plots.enabled = false;
    }
    if args.ascii_plot {
        config.plots.ascii = true;
    }
    config
}
