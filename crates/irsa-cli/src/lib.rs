//! irsa-verify CLI library

pub mod commands;
pub mod config;
pub mod error;
pub mod retry;
pub mod sources;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::{VerifyConfig, CONFIG_ENV};

/// irsa-verify - workload identity federation verification
#[derive(Parser, Debug)]
#[command(name = "irsa-verify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(long, env = CONFIG_ENV, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Property-check a trust policy and scan resources
    Verify(commands::verify::VerifyArgs),
    /// Scan an inventory snapshot for compliance violations
    Scan(commands::scan::ScanArgs),
    /// Explain the trust decision for one principal
    Evaluate(commands::evaluate::EvaluateArgs),
}

impl Cli {
    /// Run the CLI command and return the process exit code
    pub async fn run(self) -> Result<u8> {
        let config = VerifyConfig::load(self.config.as_deref())?;
        match self.command {
            Commands::Verify(args) => commands::verify::run(args, &config).await,
            Commands::Scan(args) => commands::scan::run(args, &config).await,
            Commands::Evaluate(args) => commands::evaluate::run(args, &config).await,
        }
    }
}
