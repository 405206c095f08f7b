//! Workload principals attempting to obtain delegated credentials

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix of the `sub` claim in projected ServiceAccount tokens
pub const SERVICE_ACCOUNT_SUBJECT_PREFIX: &str = "system:serviceaccount:";

/// Build the token subject for a ServiceAccount: `system:serviceaccount:<ns>:<sa>`
pub fn subject_claim(namespace: &str, service_account: &str) -> String {
    format!(
        "{}{}:{}",
        SERVICE_ACCOUNT_SUBJECT_PREFIX, namespace, service_account
    )
}

/// A Kubernetes ServiceAccount identity presenting a federated token.
///
/// The role annotation is modeled as an `Option`: `None` means the
/// ServiceAccount carries no role annotation at all, `Some(arn)` means it is
/// annotated (possibly with an empty or wrong value).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// ServiceAccount namespace
    pub namespace: String,
    /// ServiceAccount name
    pub service_account: String,
    /// Audience of the presented token
    pub audience: String,
    /// Value of the role ARN annotation, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_annotation: Option<String>,
}

impl Principal {
    /// Create an unannotated principal
    pub fn new(
        namespace: impl Into<String>,
        service_account: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            service_account: service_account.into(),
            audience: audience.into(),
            role_annotation: None,
        }
    }

    /// Return a copy annotated with the given role reference
    pub fn annotated(mut self, role: impl Into<String>) -> Self {
        self.role_annotation = Some(role.into());
        self
    }

    /// Return a copy with the role annotation removed
    pub fn without_annotation(mut self) -> Self {
        self.role_annotation = None;
        self
    }

    /// Whether the ServiceAccount carries the role annotation
    pub fn has_annotation(&self) -> bool {
        self.role_annotation.is_some()
    }

    /// Role referenced by the annotation
    pub fn annotated_role(&self) -> Option<&str> {
        self.role_annotation.as_deref()
    }

    /// Token `sub` claim this principal presents
    pub fn subject(&self) -> String {
        subject_claim(&self.namespace, &self.service_account)
    }

    /// Check well-formedness: namespace and ServiceAccount name must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::invalid_principal("namespace is empty"));
        }
        if self.service_account.is_empty() {
            return Err(Error::invalid_principal(format!(
                "service account name is empty in namespace {}",
                self.namespace
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service_account)
    }
}
