//! Resource inventory read from a YAML or JSON snapshot file
//!
//! ```yaml
//! - name: harbor-registry-storage
//!   kind: ObjectStore
//!   tags: {Environment: workshop, Project: harbor-irsa, ManagedBy: terraform}
//!   encryptionEnabled: true
//!   encryptionKeyManaged: CustomerManaged
//!   publicAccessBlocked: true
//!   versioningEnabled: true
//! - name: alias/harbor-s3
//!   kind: EncryptionKey
//!   keyRotationEnabled: true
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use irsa_harness::ResourceInventory;
use irsa_model::ResourceDescriptor;

use crate::{Error, Result};

/// Inventory over a fixed list of resource snapshots, in file order
#[derive(Clone, Debug, Default)]
pub struct SnapshotInventory {
    order: Vec<String>,
    resources: HashMap<String, ResourceDescriptor>,
}

impl SnapshotInventory {
    /// Build from descriptors, rejecting malformed or duplicate entries.
    pub fn from_resources(resources: Vec<ResourceDescriptor>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut inventory = Self::default();
        for resource in resources {
            resource.validate()?;
            let id = resource.id();
            if !seen.insert(id.clone()) {
                return Err(Error::validation(format!("duplicate resource {}", id)));
            }
            inventory.order.push(id.clone());
            inventory.resources.insert(id, resource);
        }
        Ok(inventory)
    }

    /// Parse a snapshot document. JSON is accepted as YAML.
    pub fn parse(contents: &str) -> Result<Self> {
        let resources: Vec<ResourceDescriptor> = serde_yaml::from_str(contents)?;
        Self::from_resources(resources)
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;
        let inventory = Self::parse(&contents)?;
        info!(path = %path.display(), resources = inventory.len(), "Loaded inventory snapshot");
        Ok(inventory)
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in file order
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.order.iter().filter_map(|id| self.resources.get(id))
    }
}

#[async_trait]
impl ResourceInventory for SnapshotInventory {
    async fn list(&self) -> irsa_harness::Result<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn describe(&self, id: &str) -> irsa_harness::Result<ResourceDescriptor> {
        self.resources.get(id).cloned().ok_or_else(|| {
            irsa_harness::Error::collaborator("inventory", format!("unknown resource {}", id))
        })
    }
}
