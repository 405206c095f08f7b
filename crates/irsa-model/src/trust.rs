//! Federation trust statements and role trust policies

use serde::{Deserialize, Serialize};

use crate::principal::subject_claim;
use crate::{Error, Result};

/// Characters that would turn a claim into a pattern under `StringLike`
const WILDCARD_CHARS: &[char] = &['*', '?'];

/// One federation-trust rule: issuer plus the exact `sub` and `aud` claims it accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustStatement {
    /// Federated identity provider (OIDC provider ARN)
    pub federated_provider_id: String,
    /// Exact `sub` claim, `system:serviceaccount:<ns>:<sa>`
    pub required_subject_claim: String,
    /// Exact `aud` claim
    pub required_audience: String,
}

impl TrustStatement {
    /// Create a statement trusting a single ServiceAccount
    pub fn for_service_account(
        provider: impl Into<String>,
        namespace: &str,
        service_account: &str,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            federated_provider_id: provider.into(),
            required_subject_claim: subject_claim(namespace, service_account),
            required_audience: audience.into(),
        }
    }

    fn validate(&self, role: &str, index: usize) -> Result<()> {
        let fields = [
            ("federatedProviderId", &self.federated_provider_id),
            ("requiredSubjectClaim", &self.required_subject_claim),
            ("requiredAudience", &self.required_audience),
        ];
        for (field, value) in fields {
            if value.is_empty() {
                return Err(Error::malformed_policy(
                    role,
                    format!("statement {} has an empty {}", index, field),
                ));
            }
        }
        for (field, value) in [
            ("requiredSubjectClaim", &self.required_subject_claim),
            ("requiredAudience", &self.required_audience),
        ] {
            if value.contains(WILDCARD_CHARS) {
                return Err(Error::malformed_policy(
                    role,
                    format!(
                        "statement {} {} '{}' contains a wildcard; claims must be exact",
                        index, field, value
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Ordered set of trust statements owned by one IAM role
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustPolicy {
    /// ARN of the role that owns this policy
    pub role_arn: String,
    /// Statements, evaluated in order
    pub statements: Vec<TrustStatement>,
}

impl TrustPolicy {
    /// Create a policy for a role
    pub fn new(role_arn: impl Into<String>, statements: Vec<TrustStatement>) -> Self {
        Self {
            role_arn: role_arn.into(),
            statements,
        }
    }

    /// Role that owns this policy
    pub fn owning_role(&self) -> &str {
        &self.role_arn
    }

    /// Reject policies that cannot be evaluated safely.
    ///
    /// A usable policy names its role, has at least one statement, and every
    /// statement carries non-empty, wildcard-free claims.
    pub fn validate(&self) -> Result<()> {
        if self.role_arn.is_empty() {
            return Err(Error::malformed_policy("<unnamed>", "role ARN is empty"));
        }
        if self.statements.is_empty() {
            return Err(Error::malformed_policy(
                &self.role_arn,
                "policy has no trust statements",
            ));
        }
        for (index, statement) in self.statements.iter().enumerate() {
            statement.validate(&self.role_arn, index)?;
        }
        Ok(())
    }
}
