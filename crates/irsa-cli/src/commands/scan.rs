//! `irsa-verify scan` - compliance scan of an inventory snapshot

use std::path::PathBuf;

use clap::Args;

use irsa_harness::PropertyHarness;

use super::{cancel_on_ctrl_c, emit_report, OutputFormat};
use crate::config::VerifyConfig;
use crate::sources::SnapshotInventory;
use crate::Result;

/// Scan provisioned resources for compliance violations
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Resource inventory snapshot (YAML or JSON)
    #[arg(long)]
    pub inventory: PathBuf,

    /// Required tag key (repeatable; replaces the configured list)
    #[arg(long = "required-tag")]
    pub required_tags: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Run the scan command
pub async fn run(args: ScanArgs, config: &VerifyConfig) -> Result<u8> {
    let mut config = config.clone();
    if !args.required_tags.is_empty() {
        config.required_tags = args.required_tags.clone();
    }

    let inventory = SnapshotInventory::load(&args.inventory)?;
    let cancel = cancel_on_ctrl_c();
    let report = PropertyHarness::new(config.harness_config(0))
        .scan_inventory(&inventory, &cancel)
        .await?;
    emit_report(&report, args.output)
}
