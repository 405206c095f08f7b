//! Identity and resource model for workload identity federation checks
//!
//! Typed snapshots consumed by the trust evaluator, compliance scanner, and
//! property harness. Nothing in this crate talks to a cluster or cloud API.
//!
//! # Entity Model
//!
//! ```text
//! Principal       harbor/harbor-registry, aud=sts.amazonaws.com, role=arn:...:role/harbor-s3
//! TrustPolicy     arn:...:role/harbor-s3 -> [TrustStatement, ...]
//! TrustStatement  provider=arn:...:oidc-provider/oidc.eks..., sub=system:serviceaccount:harbor:harbor-registry
//! Resource        ObjectStore "harbor-registry-storage" {tags, encryption, versioning, ...}
//! Scenario        (Principal, expected Allow|Deny)
//! TestResult      (scenario id, actual, expected, passed, detail)
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod iam;
pub mod principal;
pub mod resource;
pub mod scenario;
pub mod trust;

pub use error::{Error, Result};
pub use principal::{subject_claim, Principal, SERVICE_ACCOUNT_SUBJECT_PREFIX};
pub use resource::{KeyManagement, ResourceDescriptor, ResourceKind};
pub use scenario::{FailureKind, Outcome, Scenario, ScenarioKind, TestResult};
pub use trust::{TrustPolicy, TrustStatement};

/// Audience presented by projected ServiceAccount tokens for STS federation
pub const DEFAULT_AUDIENCE: &str = "sts.amazonaws.com";

/// ServiceAccount annotation that binds a workload to an IAM role
pub const ROLE_ARN_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

/// ServiceAccount annotation that overrides the token audience
pub const AUDIENCE_ANNOTATION: &str = "eks.amazonaws.com/audience";
