//! Resource compliance scanning
//!
//! Each rule is checked independently, so one resource can report several
//! violations. Rules by kind:
//!
//! | Kind          | Rules                                                        |
//! |---------------|--------------------------------------------------------------|
//! | ObjectStore   | tags, encryption, customer-managed key, public access, versioning |
//! | EncryptionKey | tags, rotation                                               |
//! | IdentityRole  | tags, policy count, broad managed policy                     |
//! | Cluster       | tags                                                         |
//! | Unmodeled     | none                                                         |
//!
//! Unmodeled kinds are vacuously compliant. That is a known gap, not a
//! default-allow decision.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use irsa_model::{KeyManagement, ResourceDescriptor, ResourceKind};

/// Organizational tags every modeled resource must carry
pub const DEFAULT_REQUIRED_TAGS: [&str; 3] = ["Environment", "Project", "ManagedBy"];

/// Maximum policies an identity role may have attached
pub const DEFAULT_MAX_ATTACHED_POLICIES: u32 = 3;

// =============================================================================
// Types
// =============================================================================

/// One rule failure on a resource
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Violation {
    /// Required tag absent
    MissingTag(String),
    /// Object store has no server-side encryption
    EncryptionDisabled,
    /// Object store not encrypted with a customer-managed key
    NotCustomerManagedKey,
    /// Encryption key does not rotate automatically
    RotationDisabled,
    /// Object store allows public access
    PublicAccessNotBlocked,
    /// Object store versioning is off
    VersioningDisabled,
    /// Identity role has more attached policies than allowed
    ExcessivePolicyCount {
        /// Attached policy count
        count: u32,
        /// Configured limit
        limit: u32,
    },
    /// Identity role uses a broad provider-managed policy
    BroadManagedPolicyUsed,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingTag(key) => write!(f, "MissingTag({})", key),
            Violation::EncryptionDisabled => f.write_str("EncryptionDisabled"),
            Violation::NotCustomerManagedKey => f.write_str("NotCustomerManagedKey"),
            Violation::RotationDisabled => f.write_str("RotationDisabled"),
            Violation::PublicAccessNotBlocked => f.write_str("PublicAccessNotBlocked"),
            Violation::VersioningDisabled => f.write_str("VersioningDisabled"),
            Violation::ExcessivePolicyCount { count, limit } => {
                write!(f, "ExcessivePolicyCount({} > {})", count, limit)
            }
            Violation::BroadManagedPolicyUsed => f.write_str("BroadManagedPolicyUsed"),
        }
    }
}

/// Tunable parts of the rule set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceRules {
    /// Tag keys every modeled resource must carry
    pub required_tags: Vec<String>,
    /// Maximum attached policies on an identity role
    pub max_attached_policies: u32,
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self {
            required_tags: DEFAULT_REQUIRED_TAGS.iter().map(|t| t.to_string()).collect(),
            max_attached_policies: DEFAULT_MAX_ATTACHED_POLICIES,
        }
    }
}

// =============================================================================
// Scanner
// =============================================================================

/// Evaluates resource snapshots against a fixed rule set
#[derive(Clone, Debug, Default)]
pub struct ComplianceScanner {
    rules: ComplianceRules,
}

impl ComplianceScanner {
    /// Create a scanner with the given rules
    pub fn new(rules: ComplianceRules) -> Self {
        Self { rules }
    }

    /// Rules this scanner applies
    pub fn rules(&self) -> &ComplianceRules {
        &self.rules
    }

    /// List every violation of `resource`. Empty means compliant.
    pub fn scan(&self, resource: &ResourceDescriptor) -> Vec<Violation> {
        if resource.kind == ResourceKind::Unmodeled {
            warn!(
                resource = %resource.name,
                "No compliance rules for resource kind; treating as compliant"
            );
            return Vec::new();
        }

        let mut violations: Vec<Violation> = self
            .rules
            .required_tags
            .iter()
            .filter(|key| !resource.tags.contains_key(key.as_str()))
            .map(|key| Violation::MissingTag(key.clone()))
            .collect();

        match resource.kind {
            ResourceKind::ObjectStore => object_store_rules(resource, &mut violations),
            ResourceKind::EncryptionKey => {
                if !resource.key_rotation_enabled {
                    violations.push(Violation::RotationDisabled);
                }
            }
            ResourceKind::IdentityRole => {
                if resource.attached_policy_count > self.rules.max_attached_policies {
                    violations.push(Violation::ExcessivePolicyCount {
                        count: resource.attached_policy_count,
                        limit: self.rules.max_attached_policies,
                    });
                }
                if resource.uses_managed_broad_policy {
                    violations.push(Violation::BroadManagedPolicyUsed);
                }
            }
            ResourceKind::Cluster | ResourceKind::Unmodeled => {}
        }

        for violation in &violations {
            debug!(resource = %resource.id(), %violation, "Compliance violation");
        }
        violations
    }
}

fn object_store_rules(resource: &ResourceDescriptor, violations: &mut Vec<Violation>) {
    if !resource.encryption_enabled {
        violations.push(Violation::EncryptionDisabled);
    }
    if resource.encryption_key_managed != KeyManagement::CustomerManaged {
        violations.push(Violation::NotCustomerManagedKey);
    }
    if !resource.public_access_blocked {
        violations.push(Violation::PublicAccessNotBlocked);
    }
    if !resource.versioning_enabled {
        violations.push(Violation::VersioningDisabled);
    }
}

/// Scan with the default rule set
pub fn scan(resource: &ResourceDescriptor) -> Vec<Violation> {
    ComplianceScanner::default().scan(resource)
}

// =============================================================================
// Tests
// =============================================================================
