//! Check that the tuning database is reachable and count its studies.
//!
//! Connection problems are printed rather than failing the process, so the
//! check can run as a container health probe that only reports.

use std::process::ExitCode;

use clap::Parser;
use docktuna::{Result, StudyRegistry, get_registry};

/// Report the studies found in the tuning database.
#[derive(Parser, Debug)]
#[command(name = "check_connections", version)]
struct Cli {}

fn report(registry: &StudyRegistry) -> Result<String> {
    let n_studies = registry.get_all_studies()?.len();
    Ok(format!(
        "Successfully checked for existing studies in:\n\
         \tDatabase {} on host {} as user {}.\n\
         \tNumber studies found = {n_studies}",
        registry.db_name()?,
        registry.hostname()?,
        registry.username()?,
    ))
}

fn main() -> ExitCode {
    let _cli = Cli::parse();
    if let Err(e) = docktuna::logging::init_subscriber() {
        eprintln!("Error: {e}");
    }

    match get_registry().and_then(|registry| report(&registry)) {
        Ok(summary) => println!("{summary}"),
        Err(e) => println!("{e}"),
    }
    ExitCode::SUCCESS
}
