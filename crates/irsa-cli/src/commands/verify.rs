//! `irsa-verify verify` - property check of a trust policy plus resource scan

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use irsa_harness::{fetch_principal, PropertyHarness, Report};
use irsa_model::{Principal, TrustPolicy};

use super::{cancel_on_ctrl_c, emit_report, load_trust_policy, OutputFormat};
use crate::config::VerifyConfig;
use crate::sources::{KubeIdentitySource, SnapshotInventory};
use crate::Result;

/// Verify that only the canonical ServiceAccount can assume the role
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Iterations of the scenario matrix
    #[arg(long, default_value_t = 10)]
    pub iterations: u32,

    /// Generation seed (random when omitted; printed in the report)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Namespace of the only ServiceAccount that should be trusted
    #[arg(long)]
    pub canonical_namespace: String,

    /// Name of the only ServiceAccount that should be trusted
    #[arg(long)]
    pub canonical_service_account: String,

    /// ARN of the role whose trust policy is verified
    #[arg(long)]
    pub role_arn: String,

    /// IAM trust policy document (JSON)
    #[arg(long)]
    pub trust_policy: PathBuf,

    /// Resource inventory snapshot to scan (YAML or JSON)
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Token audience of the canonical principal (overrides config).
    ///
    /// Not accepted with --live: the audience then comes from the
    /// ServiceAccount's audience annotation, and the config value is unused.
    #[arg(long, conflicts_with_all = ["live", "kubeconfig"])]
    pub audience: Option<String>,

    /// Minimum iterations for sufficient coverage (overrides config)
    #[arg(long)]
    pub min_iterations: Option<u32>,

    /// Read the canonical ServiceAccount from the cluster instead of flags
    #[arg(long)]
    pub live: bool,

    /// Kubeconfig for --live (implies --live; default: kube resolution chain)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl VerifyArgs {
    fn is_live(&self) -> bool {
        self.live || self.kubeconfig.is_some()
    }
}

/// Run the verify command
pub async fn run(args: VerifyArgs, config: &VerifyConfig) -> Result<u8> {
    let policy = load_trust_policy(&args.role_arn, &args.trust_policy)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, iterations = args.iterations, "Starting verification");

    let mut config = config.clone();
    if let Some(min) = args.min_iterations {
        config.min_iterations = min;
    }
    if let Some(audience) = &args.audience {
        config.audience = audience.clone();
    }

    let canonical = canonical_principal(&args, &config).await?;
    let report = run_harness(&args, &config, seed, &canonical, &policy).await?;
    emit_report(&report, args.output)
}

async fn canonical_principal(args: &VerifyArgs, config: &VerifyConfig) -> Result<Principal> {
    if !args.is_live() {
        return Ok(Principal::new(
            args.canonical_namespace.as_str(),
            args.canonical_service_account.as_str(),
            config.audience.as_str(),
        )
        .annotated(args.role_arn.as_str()));
    }

    let source = KubeIdentitySource::connect(args.kubeconfig.as_deref()).await?;
    let principal = fetch_principal(
        &source,
        &args.canonical_namespace,
        &args.canonical_service_account,
        config.query_timeout(),
    )
    .await?;
    Ok(principal)
}

async fn run_harness(
    args: &VerifyArgs,
    config: &VerifyConfig,
    seed: u64,
    canonical: &Principal,
    policy: &TrustPolicy,
) -> Result<Report> {
    let cancel = cancel_on_ctrl_c();
    let mut harness = PropertyHarness::new(config.harness_config(seed));

    let report = match &args.inventory {
        Some(path) => {
            let inventory = SnapshotInventory::load(path)?;
            harness
                .run_with_inventory(args.iterations, canonical, policy, &inventory, &cancel)
                .await?
        }
        None => harness.run_probes(args.iterations, canonical, policy, Vec::new(), &cancel)?,
    };
    Ok(report)
}
