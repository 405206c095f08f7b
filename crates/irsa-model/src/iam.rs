//! IAM role trust-policy document ingestion
//!
//! Converts the JSON trust policy attached to an IAM role into a
//! [`TrustPolicy`]. Only the web-identity federation subset is modeled:
//!
//! ```json
//! {
//!   "Version": "2012-10-17",
//!   "Statement": [{
//!     "Effect": "Allow",
//!     "Principal": { "Federated": "arn:aws:iam::123456789012:oidc-provider/oidc.eks.us-west-2.amazonaws.com/id/ABC" },
//!     "Action": "sts:AssumeRoleWithWebIdentity",
//!     "Condition": {
//!       "StringEquals": {
//!         "oidc.eks.us-west-2.amazonaws.com/id/ABC:sub": "system:serviceaccount:harbor:harbor-registry",
//!         "oidc.eks.us-west-2.amazonaws.com/id/ABC:aud": "sts.amazonaws.com"
//!       }
//!     }
//!   }]
//! }
//! ```
//!
//! Anything that would loosen exact matching (pattern operators on `sub` or
//! `aud`, missing claims, explicit `Deny` statements) is rejected as malformed
//! rather than approximated.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::trust::{TrustPolicy, TrustStatement};
use crate::{Error, Result};

/// STS action used by projected ServiceAccount tokens
pub const WEB_IDENTITY_ACTION: &str = "sts:AssumeRoleWithWebIdentity";

const OIDC_PROVIDER_MARKER: &str = "oidc-provider/";
const EXACT_OPERATOR: &str = "StringEquals";
const SUBJECT_SUFFIX: &str = ":sub";
const AUDIENCE_SUFFIX: &str = ":aud";

// =============================================================================
// Raw document shape
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PolicyDocument {
    statement: OneOrMany<RawStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStatement {
    effect: String,
    #[serde(default)]
    principal: Option<RawPrincipal>,
    action: OneOrMany<String>,
    #[serde(default)]
    condition: BTreeMap<String, BTreeMap<String, OneOrMany<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPrincipal {
    #[serde(default)]
    federated: Option<OneOrMany<String>>,
}

// =============================================================================
// Conversion
// =============================================================================

impl TrustPolicy {
    /// Parse an IAM trust-policy JSON document owned by `role_arn`.
    ///
    /// Each `(sub, aud)` value pair in a web-identity statement becomes one
    /// [`TrustStatement`]. The returned policy has already passed
    /// [`TrustPolicy::validate`].
    pub fn from_iam_document(role_arn: &str, document: &str) -> Result<Self> {
        let doc: PolicyDocument = serde_json::from_str(document)
            .map_err(|e| Error::malformed_policy(role_arn, format!("invalid JSON: {}", e)))?;

        let mut statements = Vec::new();
        for (index, raw) in doc.statement.into_vec().into_iter().enumerate() {
            statements.extend(convert_statement(role_arn, index, raw)?);
        }

        if statements.is_empty() {
            return Err(Error::malformed_policy(
                role_arn,
                format!("no Allow statement grants {}", WEB_IDENTITY_ACTION),
            ));
        }

        let policy = TrustPolicy::new(role_arn, statements);
        policy.validate()?;
        Ok(policy)
    }
}

fn convert_statement(role: &str, index: usize, raw: RawStatement) -> Result<Vec<TrustStatement>> {
    let actions = raw.action.into_vec();
    if !actions.iter().any(|a| a == WEB_IDENTITY_ACTION) {
        return Ok(Vec::new());
    }

    if raw.effect != "Allow" {
        return Err(Error::malformed_policy(
            role,
            format!(
                "statement {} has Effect '{}'; only Allow web-identity statements are supported",
                index, raw.effect
            ),
        ));
    }

    let mut providers = raw
        .principal
        .and_then(|p| p.federated)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();
    if providers.len() != 1 {
        return Err(Error::malformed_policy(
            role,
            format!(
                "statement {} must name exactly one federated provider, found {}",
                index,
                providers.len()
            ),
        ));
    }
    let provider = providers.remove(0);
    let issuer = provider
        .split_once(OIDC_PROVIDER_MARKER)
        .map(|(_, issuer)| issuer.to_string())
        .filter(|issuer| !issuer.is_empty())
        .ok_or_else(|| {
            Error::malformed_policy(
                role,
                format!("statement {} provider '{}' is not an OIDC provider ARN", index, provider),
            )
        })?;

    let mut subjects = None;
    let mut audiences = None;

    for (operator, conditions) in raw.condition {
        for (key, values) in conditions {
            let claim = if key.ends_with(SUBJECT_SUFFIX) {
                SUBJECT_SUFFIX
            } else if key.ends_with(AUDIENCE_SUFFIX) {
                AUDIENCE_SUFFIX
            } else {
                continue;
            };

            if operator != EXACT_OPERATOR {
                return Err(Error::malformed_policy(
                    role,
                    format!(
                        "statement {} uses {} on '{}'; identity claims must use {}",
                        index, operator, key, EXACT_OPERATOR
                    ),
                ));
            }

            let expected_key = format!("{}{}", issuer, claim);
            if key != expected_key {
                return Err(Error::malformed_policy(
                    role,
                    format!(
                        "statement {} condition key '{}' does not belong to issuer '{}'",
                        index, key, issuer
                    ),
                ));
            }

            let values = values.into_vec();
            if claim == SUBJECT_SUFFIX {
                subjects = Some(values);
            } else {
                audiences = Some(values);
            }
        }
    }

    let subjects = subjects.ok_or_else(|| {
        Error::malformed_policy(
            role,
            format!("statement {} has no StringEquals condition on {}:sub", index, issuer),
        )
    })?;
    let audiences = audiences.ok_or_else(|| {
        Error::malformed_policy(
            role,
            format!("statement {} has no StringEquals condition on {}:aud", index, issuer),
        )
    })?;

    let mut out = Vec::with_capacity(subjects.len() * audiences.len());
    for subject in &subjects {
        for audience in &audiences {
            out.push(TrustStatement {
                federated_provider_id: provider.clone(),
                required_subject_claim: subject.clone(),
                required_audience: audience.clone(),
            });
        }
    }
    Ok(out)
}
