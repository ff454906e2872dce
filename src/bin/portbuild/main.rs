//! portbuild CLI - build ports from recipes

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portbuild::core::{port_error, EXIT_FAILURE};
use portbuild::util::context::SourceKind;
use portbuild::util::diagnostic::{emit, Diagnostic};
use portbuild::util::shell::Shell;
use portbuild::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("portbuild=debug")
    } else if cli.quiet {
        EnvFilter::new("portbuild=warn")
    } else {
        EnvFilter::new("portbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = Shell::from_flags(cli.quiet, cli.verbose, cli.no_color).use_color();
    if let Err(e) = run(cli) {
        std::process::exit(report(&e, color));
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        verbose,
        quiet,
        no_color,
        local,
        config,
        command,
    } = cli;

    let load = || {
        let shell = Shell::from_flags(quiet, verbose, no_color);
        let kind = if local {
            SourceKind::Local
        } else {
            SourceKind::Remote
        };
        GlobalContext::load(config.as_deref(), shell, kind)
    };

    // Execute command
    match command {
        Commands::List => commands::list::execute(&load()?),
        Commands::About(args) => commands::about::execute(args, &load()?),
        Commands::Search(args) => commands::search::execute(args, &load()?),
        Commands::Get => commands::get::execute(&load()?),
        Commands::Build(args) => commands::build::execute(args, &load()?),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error and pick the exit status.
///
/// A missing port is reported as a plain message; everything else gets the
/// full diagnostic.
fn report(err: &anyhow::Error, color: bool) -> i32 {
    match port_error(err) {
        Some(found) if found.is_not_found() => {
            eprintln!("{}", found);
            EXIT_FAILURE
        }
        Some(found) => {
            emit(&Diagnostic::from_error(err), color);
            found.exit_code()
        }
        None => {
            emit(&Diagnostic::from_error(err), color);
            EXIT_FAILURE
        }
    }
}
