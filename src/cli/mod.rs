//! Command-line parsing for the synchrotron + IC SED fitter.
//!
//! Argument parsing and command dispatch stay separate from the modeling and
//! sampling code: flags only override fields of a `RunConfig`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sedfit", version, about = "MCMC fit of a synchrotron + inverse-Compton SED")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fit and write the sampler, results table and plots.
    Fit(FitArgs),
    /// Print the summary of a saved sampler file.
    Summary(SummaryArgs),
    /// Print the default run configuration as JSON.
    Config,
}

/// Options for `sedfit fit`. Anything left unset comes from the config file
/// (or the built-in defaults).
#[derive(Debug, Parser, Clone, Default)]
pub struct FitArgs {
    /// Run configuration JSON (see `sedfit config`).
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// X-ray spectrum table (IPAC or ECSV).
    #[arg(long, value_name = "FILE")]
    pub xray: Option<PathBuf>,

    /// VHE spectrum table (IPAC or ECSV).
    #[arg(long, value_name = "FILE")]
    pub vhe: Option<PathBuf>,

    /// Prefix of every output file.
    #[arg(short = 'l', long)]
    pub label: Option<String>,

    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of walkers (even, at least twice the parameter count).
    #[arg(short = 'w', long)]
    pub walkers: Option<usize>,

    /// Burn-in steps (discarded).
    #[arg(long)]
    pub burn: Option<usize>,

    /// Recorded steps.
    #[arg(long)]
    pub run: Option<usize>,

    /// Worker threads for walker evaluation.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the SVG diagnostic plots.
    #[arg(long)]
    pub no_plots: bool,

    /// Print an ASCII SED preview of the data and ML model.
    #[arg(long)]
    pub ascii_plot: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    /// Sampler file written by `sedfit fit`: `<label>_sampler.bin`, a bincode
    /// dump of the sampler state (not a Python pickle).
    #[arg(value_name = "SAMPLER")]
    pub path: PathBuf,

    /// Plot width (columns) of the ASCII preview.
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows) of the ASCII preview.
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_flags_parse() {
        let cli = Cli::parse_from([
            "sedfit", "fit", "--walkers", "16", "--burn", "3", "--run", "2", "--seed", "7", "--no-plots", "-l", "crab",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.walkers, Some(16));
        assert_eq!(args.burn, Some(3));
        assert_eq!(args.run, Some(2));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.label.as_deref(), Some("crab"));
        assert!(args.no_plots);
        assert!(!args.ascii_plot);
        assert_eq!(args.threads, None);
    }

    #[test]
    fn summary_takes_a_path() {
        let cli = Cli::parse_from(["sedfit", "summary", "out/crab_sampler.bin"]);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.path, PathBuf::from("out/crab_sampler.bin"));
        assert_eq!(args.width, 72);
    }

    #[test]
    fn config_has_no_arguments() {
        let cli = Cli::parse_from(["sedfit", "config"]);
        assert!(matches!(cli.command, Command::Config));
    }
}
