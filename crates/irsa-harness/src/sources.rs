//! External fact sources and time-boxed gathering
//!
//! The harness never talks to a cluster or cloud API directly. Identity facts
//! and resource snapshots come through these traits; every query is wrapped
//! in a caller-supplied deadline so a hung collaborator cannot stall a run.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

#[cfg(test)]
use mockall::automock;

use irsa_model::{Principal, ResourceDescriptor};

use crate::{Error, Result};

// =============================================================================
// Traits
// =============================================================================

/// Read-only source of workload identity facts (e.g. the Kubernetes API)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Look up the principal for a ServiceAccount, including its annotation
    /// and token audience.
    async fn principal(&self, namespace: &str, service_account: &str) -> Result<Principal>;
}

/// Read-only inventory of provisioned cloud resources
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceInventory: Send + Sync {
    /// Identifiers of every resource to check
    async fn list(&self) -> Result<Vec<String>>;

    /// Current snapshot of one resource
    async fn describe(&self, id: &str) -> Result<ResourceDescriptor>;
}

// =============================================================================
// Gathering
// =============================================================================

/// Result of querying one resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceProbe {
    /// Snapshot retrieved
    Described(ResourceDescriptor),
    /// Query exceeded its deadline
    TimedOut(String),
    /// Query failed
    Failed {
        /// Resource identifier
        id: String,
        /// Error message
        message: String,
    },
}

/// Fetch the canonical principal, failing the run if the source is unreachable.
///
/// A source that errors is a precondition failure; one that does not answer
/// within `timeout` is reported as [`Error::Timeout`].
#[instrument(skip(source))]
pub async fn fetch_principal(
    source: &dyn IdentitySource,
    namespace: &str,
    service_account: &str,
    timeout: Duration,
) -> Result<Principal> {
    let what = format!("ServiceAccount {}/{}", namespace, service_account);
    match tokio::time::timeout(timeout, source.principal(namespace, service_account)).await {
        Ok(Ok(principal)) => {
            debug!(
                principal = %principal,
                annotated = principal.has_annotation(),
                "Fetched principal"
            );
            Ok(principal)
        }
        Ok(Err(e)) => Err(Error::precondition(format!(
            "identity source unavailable for {}: {}",
            what, e
        ))),
        Err(_) => Err(Error::timeout(what, timeout)),
    }
}

/// List inventory ids; an unreachable or unresponsive inventory fails the run.
pub async fn list_resources(
    inventory: &dyn ResourceInventory,
    timeout: Duration,
) -> Result<Vec<String>> {
    match tokio::time::timeout(timeout, inventory.list()).await {
        Ok(Ok(ids)) => Ok(ids),
        Ok(Err(e)) => Err(Error::precondition(format!("inventory unavailable: {}", e))),
        Err(_) => Err(Error::timeout("inventory listing", timeout)),
    }
}

/// Describe every resource with at most `concurrency` queries in flight.
///
/// Results keep the order of `ids`. Once `cancel` fires no new query is
/// started, but queries already running finish and are returned.
#[instrument(skip(inventory, ids, cancel), fields(count = ids.len()))]
pub async fn gather_resources(
    inventory: &dyn ResourceInventory,
    ids: &[String],
    timeout: Duration,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<ResourceProbe> {
    stream::iter(ids.iter().cloned())
        .map(|id| async move {
            if cancel.is_cancelled() {
                return None;
            }
            Some(probe(inventory, id, timeout).await)
        })
        .buffered(concurrency.max(1))
        .filter_map(|probe| async move { probe })
        .collect()
        .await
}

async fn probe(inventory: &dyn ResourceInventory, id: String, timeout: Duration) -> ResourceProbe {
    match tokio::time::timeout(timeout, inventory.describe(&id)).await {
        Ok(Ok(descriptor)) => ResourceProbe::Described(descriptor),
        Ok(Err(e)) => {
            warn!(resource = %id, error = %e, "Resource query failed");
            ResourceProbe::Failed {
                id,
                message: e.to_string(),
            }
        }
        Err(_) => {
            warn!(resource = %id, timeout_ms = timeout.as_millis(), "Resource query timed out");
            ResourceProbe::TimedOut(id)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use irsa_model::ResourceKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    /// Inventory that sleeps before answering and tracks peak concurrency
    #[derive(Default)]
    struct SlowInventory {
        delay: Duration,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        started: Arc<AtomicUsize>,
        /// Cancelled as soon as the first query starts
        cancel_on_start: Option<CancellationToken>,
    }

    impl SlowInventory {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ResourceInventory for SlowInventory {
        async fn list(&self) -> Result<Vec<String>> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }

        async fn describe(&self, id: &str) -> Result<ResourceDescriptor> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if let Some(cancel) = &self.cancel_on_start {
                cancel.cancel();
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ResourceDescriptor::new(id, ResourceKind::Cluster))
        }
    }

    // ========================================================================
    // Identity Source
    // ========================================================================

    #[tokio::test]
    async fn test_fetch_principal_success() {
        let mut source = MockIdentitySource::new();
        source
            .expect_principal()
            .withf(|ns, sa| ns == "harbor" && sa == "harbor-registry")
            .returning(|ns, sa| Ok(Principal::new(ns, sa, "sts.amazonaws.com")));

        let p = fetch_principal(&source, "harbor", "harbor-registry", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(p.namespace, "harbor");
    }

    #[tokio::test]
    async fn test_fetch_principal_unreachable_is_precondition() {
        let mut source = MockIdentitySource::new();
        source
            .expect_principal()
            .returning(|_, _| Err(Error::collaborator("kubernetes", "connection refused")));

        let err = fetch_principal(&source, "harbor", "harbor-registry", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fetch_principal_hung_source_times_out() {
        struct HungSource;

        #[async_trait]
        impl IdentitySource for HungSource {
            async fn principal(&self, ns: &str, sa: &str) -> Result<Principal> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Principal::new(ns, sa, "sts.amazonaws.com"))
            }
        }

        let timeout = Duration::from_millis(10);
        let err = fetch_principal(&HungSource, "harbor", "harbor-registry", timeout)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("ServiceAccount harbor/harbor-registry"));
    }

    // ========================================================================
    // Inventory
    // ========================================================================

    #[tokio::test]
    async fn test_list_failure_is_precondition() {
        let mut inventory = MockResourceInventory::new();
        inventory
            .expect_list()
            .returning(|| Err(Error::collaborator("inventory", "access denied")));

        let err = list_resources(&inventory, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_list_timeout_is_distinct() {
        let inventory = SlowInventory::new(Duration::from_millis(200));

        let err = list_resources(&inventory, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(!matches!(err, Error::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_gather_preserves_order_and_reports_failures() {
        let mut inventory = MockResourceInventory::new();
        inventory.expect_describe().returning(|id| {
            if id == "broken" {
                Err(Error::collaborator("inventory", "not found"))
            } else {
                Ok(ResourceDescriptor::new(id, ResourceKind::ObjectStore))
            }
        });

        let probes = gather_resources(
            &inventory,
            &ids(&["a", "broken", "c"]),
            Duration::from_secs(1),
            2,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(probes.len(), 3);
        assert!(matches!(&probes[0], ResourceProbe::Described(r) if r.name == "a"));
        assert!(matches!(&probes[1], ResourceProbe::Failed { id, .. } if id == "broken"));
        assert!(matches!(&probes[2], ResourceProbe::Described(r) if r.name == "c"));
    }

    #[tokio::test]
    async fn test_gather_times_out_slow_queries() {
        let inventory = SlowInventory::new(Duration::from_millis(200));

        let probes = gather_resources(
            &inventory,
            &ids(&["slow"]),
            Duration::from_millis(10),
            1,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(probes, vec![ResourceProbe::TimedOut("slow".to_string())]);
    }

    #[tokio::test]
    async fn test_gather_bounds_concurrency() {
        let peak = Arc::new(AtomicUsize::new(0));
        let inventory = SlowInventory {
            peak: peak.clone(),
            ..SlowInventory::new(Duration::from_millis(20))
        };

        let probes = gather_resources(
            &inventory,
            &ids(&["a", "b", "c", "d", "e", "f"]),
            Duration::from_secs(1),
            2,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(probes.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_gather_stops_scheduling_after_cancel() {
        let inventory = MockResourceInventory::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let probes = gather_resources(
            &inventory,
            &ids(&["a", "b"]),
            Duration::from_secs(1),
            2,
            &cancel,
        )
        .await;

        // no expectations set: any describe call would panic
        assert!(probes.is_empty());
    }

    #[tokio::test]
    async fn test_gather_finishes_in_flight_query_on_cancel() {
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicUsize::new(0));
        let inventory = SlowInventory {
            started: started.clone(),
            cancel_on_start: Some(cancel.clone()),
            ..SlowInventory::new(Duration::from_millis(20))
        };

        let probes = gather_resources(
            &inventory,
            &ids(&["a", "b", "c"]),
            Duration::from_secs(1),
            1,
            &cancel,
        )
        .await;

        // "a" was running when the token fired and is kept; nothing after it starts
        assert_eq!(
            probes,
            vec![ResourceProbe::Described(ResourceDescriptor::new(
                "a",
                ResourceKind::Cluster
            ))]
        );
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
