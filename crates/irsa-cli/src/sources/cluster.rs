//! ServiceAccount lookups through the Kubernetes API

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, instrument};

use irsa_harness::IdentitySource;
use irsa_model::{Principal, AUDIENCE_ANNOTATION, DEFAULT_AUDIENCE, ROLE_ARN_ANNOTATION};

use crate::commands::CommandErrorExt;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::{Error, Result};

/// Identity source backed by a live cluster
#[derive(Clone)]
pub struct KubeIdentitySource {
    client: Client,
    retry: RetryConfig,
}

impl KubeIdentitySource {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Connect using `kubeconfig`, or the kube defaults (`KUBECONFIG`,
    /// `~/.kube/config`, in-cluster) when none is given.
    pub async fn connect(kubeconfig: Option<&str>) -> Result<Self> {
        let client = match kubeconfig {
            Some(path) => {
                let kc = Kubeconfig::read_from(path).map_err(|e| {
                    Error::command_failed(format!("failed to read kubeconfig {}: {}", path, e))
                })?;
                let config = Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                    .await
                    .cmd_err()?;
                Client::try_from(config)?
            }
            None => Client::try_default().await?,
        };
        Ok(Self::new(client))
    }
}

#[async_trait]
impl IdentitySource for KubeIdentitySource {
    #[instrument(skip(self))]
    async fn principal(
        &self,
        namespace: &str,
        service_account: &str,
    ) -> irsa_harness::Result<Principal> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let found = retry_with_backoff(&self.retry, "get_service_account", || {
            api.get_opt(service_account)
        })
        .await
        .map_err(|e| irsa_harness::Error::collaborator("kubernetes", e.to_string()))?;

        let sa = found.ok_or_else(|| {
            irsa_harness::Error::collaborator(
                "kubernetes",
                format!("ServiceAccount {}/{} not found", namespace, service_account),
            )
        })?;
        let principal = principal_from_service_account(namespace, service_account, &sa);
        debug!(
            principal = %principal,
            role = principal.annotated_role().unwrap_or("<none>"),
            "Resolved ServiceAccount"
        );
        Ok(principal)
    }
}

/// Build the principal a ServiceAccount presents, from its annotations.
///
/// An empty role annotation counts as absent.
pub fn principal_from_service_account(
    namespace: &str,
    service_account: &str,
    sa: &ServiceAccount,
) -> Principal {
    let annotations = sa.metadata.annotations.as_ref();
    let lookup = |key: &str| {
        annotations
            .and_then(|a| a.get(key))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let audience = lookup(AUDIENCE_ANNOTATION).unwrap_or(DEFAULT_AUDIENCE);
    let principal = Principal::new(namespace, service_account, audience);
    match lookup(ROLE_ARN_ANNOTATION) {
        Some(role) => principal.annotated(role),
        None => principal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    const ROLE: &str = "arn:aws:iam::123456789012:role/harbor-s3";

    fn service_account(annotations: &[(&str, &str)]) -> ServiceAccount {
        let annotations: BTreeMap<String, String> = annotations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some("harbor-registry".to_string()),
                namespace: Some("harbor".to_string()),
                annotations: (!annotations.is_empty()).then_some(annotations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_annotated_service_account() {
        let sa = service_account(&[(ROLE_ARN_ANNOTATION, ROLE)]);
        let p = principal_from_service_account("harbor", "harbor-registry", &sa);

        assert_eq!(p.annotated_role(), Some(ROLE));
        assert_eq!(p.audience, DEFAULT_AUDIENCE);
        assert_eq!(p.subject(), "system:serviceaccount:harbor:harbor-registry");
    }

    #[test]
    fn test_missing_annotation() {
        let p = principal_from_service_account("harbor", "harbor-registry", &service_account(&[]));
        assert!(!p.has_annotation());
    }

    #[test]
    fn test_blank_annotation_is_absent() {
        let sa = service_account(&[(ROLE_ARN_ANNOTATION, "  ")]);
        let p = principal_from_service_account("harbor", "harbor-registry", &sa);
        assert!(!p.has_annotation());
    }

    #[test]
    fn test_audience_annotation() {
        let sa = service_account(&[(ROLE_ARN_ANNOTATION, ROLE), (AUDIENCE_ANNOTATION, "vault")]);
        let p = principal_from_service_account("harbor", "harbor-registry", &sa);
        assert_eq!(p.audience, "vault");
    }
}
