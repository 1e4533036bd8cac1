#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use cabinet::ResolveError;
use cabinet_cli::args::CliArgs;
use cabinet_cli::{Outcome, run};

const EXIT_SUCCESS: i32 = 0;
const EXIT_UNRESOLVED: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

fn main() -> Result<()> {
    // Initialize tracing if CABINET_LOG or RUST_LOG is set (zero cost otherwise).
    cabinet::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;

    match run(&args, &cwd) {
        Ok(Outcome::Resolved(path)) => {
            println!("{}", path.display());
            std::process::exit(EXIT_SUCCESS);
        }
        Ok(Outcome::Extensions(extensions)) => {
            for extension in extensions {
                println!("{}", extension);
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Ok(Outcome::Unresolved) => {
            eprintln!(
                "{} could not resolve '{}'",
                "warning:".yellow().bold(),
                args.specifier.as_deref().unwrap_or_default()
            );
            std::process::exit(EXIT_UNRESOLVED);
        }
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            let config_error = err
                .downcast_ref::<ResolveError>()
                .is_some_and(ResolveError::is_config_error);
            std::process::exit(if config_error {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_UNRESOLVED
            });
        }
    }
}
