//! `irsa-verify evaluate` - explain the decision for one principal

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use irsa_model::Principal;
use irsa_policy::{evaluate, Decision};

use super::{load_trust_policy, OutputFormat};
use crate::config::VerifyConfig;
use crate::Result;

/// Evaluate a single principal against a trust policy
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// ServiceAccount namespace
    #[arg(long)]
    pub namespace: String,

    /// ServiceAccount name
    #[arg(long)]
    pub service_account: String,

    /// Token audience (default from config)
    #[arg(long)]
    pub audience: Option<String>,

    /// Role ARN carried in the ServiceAccount annotation (omit for none)
    #[arg(long)]
    pub role_annotation: Option<String>,

    /// ARN of the role owning the trust policy
    #[arg(long)]
    pub role_arn: String,

    /// IAM trust policy document (JSON)
    #[arg(long)]
    pub trust_policy: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl EvaluateArgs {
    fn principal(&self, config: &VerifyConfig) -> Principal {
        let audience = self.audience.as_deref().unwrap_or(&config.audience);
        let principal = Principal::new(
            self.namespace.as_str(),
            self.service_account.as_str(),
            audience,
        );
        match &self.role_annotation {
            Some(role) => principal.annotated(role.as_str()),
            None => principal,
        }
    }
}

/// Run the evaluate command: exit 0 on Allow, 1 on Deny
pub async fn run(args: EvaluateArgs, config: &VerifyConfig) -> Result<u8> {
    let policy = load_trust_policy(&args.role_arn, &args.trust_policy)?;
    let principal = args.principal(config);
    let decision = evaluate(&principal, &policy)?;

    let rendered = render(&principal, &decision, args.output)?;
    let mut out = std::io::stdout().lock();
    out.write_all(rendered.as_bytes())?;
    out.flush()?;

    Ok(if decision.is_allowed() { 0 } else { 1 })
}

fn render(principal: &Principal, decision: &Decision, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format!(
            "{} (sub={}, aud={}) -> {}\n",
            principal,
            principal.subject(),
            principal.audience,
            decision
        ),
        OutputFormat::Json => {
            let value = json!({
                "principal": principal,
                "subject": principal.subject(),
                "outcome": decision.outcome(),
                "decision": decision.to_string(),
            });
            serde_json::to_string_pretty(&value)? + "\n"
        }
    })
}
