//! Pure decision functions for workload identity federation
//!
//! - [`evaluate`] decides whether a principal may assume a role under its
//!   trust policy.
//! - [`ComplianceScanner::scan`] lists the rule violations of a resource
//!   snapshot.
//!
//! Both are deterministic and side-effect free apart from `debug` logging, so
//! they can be called concurrently from any number of tasks.

#![deny(missing_docs)]

mod compliance;
mod trust;

pub use compliance::{
    scan, ComplianceRules, ComplianceScanner, Violation, DEFAULT_MAX_ATTACHED_POLICIES,
    DEFAULT_REQUIRED_TAGS,
};
pub use trust::{evaluate, Decision, DenyReason};
