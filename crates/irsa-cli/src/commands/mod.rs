//! CLI commands

use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use irsa_harness::{Report, ReportFormat, ReportSink};
use irsa_model::TrustPolicy;

use crate::{Error, Result};

pub mod evaluate;
pub mod scan;
pub mod verify;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Read an IAM trust policy document for `role_arn`.
pub fn load_trust_policy(role_arn: &str, path: &Path) -> Result<TrustPolicy> {
    let document = std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;
    let policy = TrustPolicy::from_iam_document(role_arn, &document)?;
    debug!(
        role = %role_arn,
        statements = policy.statements.len(),
        "Loaded trust policy"
    );
    Ok(policy)
}

/// Token cancelled on the first Ctrl-C.
///
/// In-flight checks still finish and are reported; nothing new is scheduled.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight checks");
            trigger.cancel();
        }
    });
    token
}

/// Print `report` to stdout and return its exit code.
pub fn emit_report(report: &Report, format: OutputFormat) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = ReportSink::new(format.into()).emit(report, &mut out)?;
    out.flush()?;
    Ok(code)
}
