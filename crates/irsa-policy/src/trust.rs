//! Trust policy evaluation
//!
//! A principal may assume a role only when:
//! 1. its ServiceAccount carries the role annotation,
//! 2. the annotation names the role that owns the policy, and
//! 3. some statement's `sub` and `aud` claims equal the principal's exactly.
//!
//! Matching is byte-for-byte: no case folding, prefixes, or patterns. A
//! one-character namespace typo is a Deny.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use irsa_model::{Outcome, Principal, TrustPolicy};

// =============================================================================
// Types
// =============================================================================

/// Why a principal was denied
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    /// ServiceAccount has no role annotation
    NoAnnotation,
    /// Annotation names a different role than the policy owner
    RoleMismatch,
    /// No statement's claims match the principal's subject and audience
    ClaimMismatch,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::NoAnnotation => "NoAnnotation",
            DenyReason::RoleMismatch => "RoleMismatch",
            DenyReason::ClaimMismatch => "ClaimMismatch",
        };
        f.write_str(s)
    }
}

/// Result of evaluating a principal against a trust policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Credentials may be issued; carries the index of the matching statement
    Allow {
        /// Index of the first matching statement
        statement: usize,
    },
    /// Credentials must be refused
    Deny {
        /// Why access was denied
        reason: DenyReason,
    },
}

impl Decision {
    /// Whether the decision grants access
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    /// Denial reason, if denied
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow { .. } => None,
            Decision::Deny { reason } => Some(*reason),
        }
    }

    /// Collapse to the Allow/Deny outcome recorded in test results
    pub fn outcome(&self) -> Outcome {
        if self.is_allowed() {
            Outcome::Allow
        } else {
            Outcome::Deny
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow { statement } => write!(f, "Allow (statement {})", statement),
            Decision::Deny { reason } => write!(f, "Deny ({})", reason),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Decide whether `principal` may assume the role owning `policy`.
///
/// Only a malformed principal is an error; Allow and Deny are both normal
/// return values.
pub fn evaluate(principal: &Principal, policy: &TrustPolicy) -> irsa_model::Result<Decision> {
    principal.validate()?;

    let decision = decide(principal, policy);

    match decision {
        Decision::Allow { statement } => debug!(
            principal = %principal,
            role = %policy.owning_role(),
            statement,
            "Trust policy allows principal"
        ),
        Decision::Deny { reason } => debug!(
            principal = %principal,
            role = %policy.owning_role(),
            ?reason,
            "Trust policy denies principal"
        ),
    }

    Ok(decision)
}

fn decide(principal: &Principal, policy: &TrustPolicy) -> Decision {
    let Some(annotated_role) = principal.annotated_role() else {
        return Decision::Deny {
            reason: DenyReason::NoAnnotation,
        };
    };

    if annotated_role != policy.owning_role() {
        return Decision::Deny {
            reason: DenyReason::RoleMismatch,
        };
    }

    let subject = principal.subject();
    policy
        .statements
        .iter()
        .position(|s| {
            s.required_subject_claim == subject && s.required_audience == principal.audience
        })
        .map(|statement| Decision::Allow { statement })
        .unwrap_or(Decision::Deny {
            reason: DenyReason::ClaimMismatch,
        })
}

// =============================================================================
// Tests
// =============================================================================
