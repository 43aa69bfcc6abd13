use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Terminal,
    /// Full report as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "testmedic")]
#[command(about = "Static analyzer and fixer for slow Go test suites", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze Go test files for performance issues
    Analyze {
        /// Path to a Go module, package directory, or single test file
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Apply automated fixes for fixable issues
        #[arg(long)]
        fix: bool,

        /// Validate each applied fix by re-running the package's tests,
        /// rolling back fixes that fail
        #[arg(long, requires = "fix")]
        validate: bool,

        /// Bound on each validation test run, in seconds
        #[arg(long = "test-timeout", requires = "validate")]
        test_timeout_secs: Option<u64>,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for pre-fix backups (defaults to a
        /// .testmedic_backups directory next to each mutated file)
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },
    /// Write a default testmedic.toml to the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}
