use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mgc")]
#[command(about = "Obfuscate sensitive data in must-gather archives", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an obfuscated copy of a must-gather directory
    Clean(CleanArgs),

    /// Validate a configuration file without touching any data
    Check {
        /// Path to the TOML configuration
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Must-gather directory to read
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for the cleaned copy (must be missing or empty)
    #[arg(short, long)]
    pub output: PathBuf,

    /// TOML configuration (default: static IP and MAC obfuscation)
    #[arg(short, long, env = "MGC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Worker threads (overrides the config file)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Where to write the JSON report (default: report.json next to the output)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report of an earlier run whose replacements should be reused
    #[arg(long)]
    pub seed_report: Option<PathBuf>,

    /// Replace a non-empty output directory
    #[arg(long)]
    pub overwrite: bool,
}
