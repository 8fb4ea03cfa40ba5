//! churnkit: churn model training and batch scoring CLI

use anyhow::Result;
use clap::Parser;

use churnkit::cli::{
    resolve_families, run_evaluate, run_explain, run_predict, run_train, run_tune_threshold, Cli, Commands,
};
use churnkit::utils::{print_banner, print_completion};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();

    match &cli.command {
        Commands::Train { families, .. } => {
            print_banner(env!("CARGO_PKG_VERSION"));
            run_train(&config, &resolve_families(families), &cli.model_settings())?;
            print_completion("Training complete!");
        }
        Commands::Evaluate => {
            print_banner(env!("CARGO_PKG_VERSION"));
            run_evaluate(&config)?;
            print_completion("Evaluation complete!");
        }
        Commands::TuneThreshold { model } => {
            run_tune_threshold(&config, *model)?;
        }
        Commands::Explain { top } => {
            run_explain(&config, *top)?;
        }
        Commands::Predict { csv, output, model } => {
            let Some(input) = csv else {
                eprintln!("Usage: churnkit predict <CSV>");
                std::process::exit(1);
            };
            run_predict(&config, input, output.as_deref(), *model)?;
        }
    }

    Ok(())
}
