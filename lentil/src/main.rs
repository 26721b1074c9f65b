mod common;
mod input_args;
mod run_filter;
mod run_metrics;
mod run_simulate;

use crate::common::*;
use run_filter::*;
use run_metrics::*;
use run_simulate::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keep the cells passing the `n_genes`, `n_counts` and
    /// `fraction_mito` thresholds
    Filter(FilterArgs),
    /// Report QC metrics and flags of every cell without filtering
    Metrics(MetricsArgs),
    /// Simulate a count matrix with damaged cells and empty droplets
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Filter(args) => {
            run_filter(args)?;
        }
        Commands::Metrics(args) => {
            run_metrics(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    Ok(())
}
