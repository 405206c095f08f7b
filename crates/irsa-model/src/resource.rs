//! Snapshots of provisioned cloud resources
//!
//! A descriptor captures only the security-relevant attributes the
//! compliance scanner reads. Snapshots are immutable; refreshing one means
//! querying the inventory again.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Kind of provisioned resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Object storage bucket (S3)
    ObjectStore,
    /// Encryption key (KMS)
    EncryptionKey,
    /// IAM role
    IdentityRole,
    /// Kubernetes cluster (EKS)
    Cluster,
    /// Any kind without compliance rules
    #[serde(other)]
    Unmodeled,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::ObjectStore => "ObjectStore",
            ResourceKind::EncryptionKey => "EncryptionKey",
            ResourceKind::IdentityRole => "IdentityRole",
            ResourceKind::Cluster => "Cluster",
            ResourceKind::Unmodeled => "Unmodeled",
        };
        f.write_str(s)
    }
}

/// Who manages the key encrypting a resource
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagement {
    /// No key configured
    #[default]
    None,
    /// Provider-owned key (e.g. SSE-S3, aws/s3 alias)
    ProviderManaged,
    /// Customer-managed KMS key
    CustomerManaged,
}

/// Security-relevant attributes of one provisioned resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Resource name or identifier (bucket name, key alias, role name)
    pub name: String,
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Server-side encryption configured
    #[serde(default)]
    pub encryption_enabled: bool,
    /// Key management mode for encryption
    #[serde(default)]
    pub encryption_key_managed: KeyManagement,
    /// Automatic key rotation enabled
    #[serde(default)]
    pub key_rotation_enabled: bool,
    /// All public access blocked
    #[serde(default)]
    pub public_access_blocked: bool,
    /// Object versioning enabled
    #[serde(default)]
    pub versioning_enabled: bool,
    /// Number of policies attached to the role
    #[serde(default)]
    pub attached_policy_count: u32,
    /// Role has a broad AWS-managed policy (e.g. AmazonS3FullAccess) attached
    #[serde(default)]
    pub uses_managed_broad_policy: bool,
}

impl ResourceDescriptor {
    /// Create a descriptor with no tags and every security control off
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: BTreeMap::new(),
            encryption_enabled: false,
            encryption_key_managed: KeyManagement::None,
            key_rotation_enabled: false,
            public_access_blocked: false,
            versioning_enabled: false,
            attached_policy_count: 0,
            uses_managed_broad_policy: false,
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Stable identifier used in reports: `<kind>/<name>`
    pub fn id(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }

    /// Reject descriptors without a name
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_resource(
                format!("<{}>", self.kind),
                "resource name is empty",
            ));
        }
        Ok(())
    }
}
