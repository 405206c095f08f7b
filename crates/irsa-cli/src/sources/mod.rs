//! Collaborator implementations: live cluster identity and inventory snapshots

pub mod cluster;
pub mod snapshot;

pub use cluster::{principal_from_service_account, KubeIdentitySource};
pub use snapshot::SnapshotInventory;
