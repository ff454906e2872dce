//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// portbuild - resolve ports from a catalog or ports tree and build them
#[derive(Parser)]
#[command(name = "portbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and recipe messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Read recipes from the checked-out ports tree instead of the catalog
    #[arg(short = 'r', long, global = true)]
    pub local: bool,

    /// Configuration file
    #[arg(long, global = true, env = "PORTBUILD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available ports
    List,

    /// Show the description of ports
    About(AboutArgs),

    /// Search port names with a regular expression
    Search(SearchArgs),

    /// Check out or update the ports tree
    Get,

    /// Build a port
    Build(BuildArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct AboutArgs {
    /// Port names
    #[arg(required = true)]
    pub ports: Vec<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regular expression matched against port names
    pub pattern: String,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Port to build, as port[-version[-revision]]
    pub port: String,

    /// Don't patch the sources, just download and unpack
    #[arg(short = 'p', long)]
    pub no_patch: bool,

    /// Don't build, just download, unpack and patch
    #[arg(short = 'b', long)]
    pub no_build: bool,

    /// Run the port's tests after building
    #[arg(long)]
    pub test: bool,

    /// Also install the port
    #[arg(short, long)]
    pub install: bool,

    /// Destination root for the install stage (exported as DESTDIR)
    #[arg(long, value_name = "DIR")]
    pub destdir: Option<PathBuf>,

    /// Remove the port's build directory first
    #[arg(short, long)]
    pub clean: bool,

    /// Run stages even if they already completed
    #[arg(short, long)]
    pub force: bool,

    /// Answer yes to all questions
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
