//! irsa-verify
//!
//! Verifies that only the intended ServiceAccount can assume a federated
//! role, and that provisioned resources meet their security baseline.
//!
//! Exit codes: 0 all checks passed, 1 any check failed, 2 setup error.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use irsa_cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries only the report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    match cli.run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "Verification aborted");
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
