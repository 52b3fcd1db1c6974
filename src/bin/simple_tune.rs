//! Tune a one-parameter quadratic against the shared tuning database.
//!
//! A starting point for projects with richer objectives: copy this file,
//! replace `objective`, and pass a sampler or pruner through
//! `StudyRegistry::get_study_with`.
//!
//! ```bash
//! simple_tune --study_name my_study --n_trials 10
//! ```

use std::process::ExitCode;

use clap::Parser;
use docktuna::{Result, Trial, format_params, get_registry};

/// Run a study that minimizes (x - 2)^2.
#[derive(Parser, Debug)]
#[command(name = "simple_tune", version)]
struct Cli {
    /// Name of the study to create or resume.
    #[arg(long = "study_name", default_value = "simple_study")]
    study_name: String,

    /// Number of trials to run.
    #[arg(long = "n_trials", default_value_t = 3)]
    n_trials: usize,
}

fn objective(trial: &mut Trial) -> Result<f64> {
    let x = trial.suggest_float("x", -10.0, 10.0)?;
    Ok((x - 2.0).powi(2))
}

fn run(cli: &Cli) -> Result<()> {
    let registry = get_registry()?;
    let study = registry.get_study(&cli.study_name)?;
    study.optimize(cli.n_trials, objective)?;
    println!("Best hyperparameters: {}", format_params(&study.best_params()?));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = docktuna::logging::init_subscriber() {
        eprintln!("Error: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
