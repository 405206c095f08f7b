//! Property test harness for workload identity federation
//!
//! A run generates seeded scenarios around one canonical principal, evaluates
//! each against the trust policy, scans resource snapshots for compliance,
//! and aggregates everything into a [`Report`]:
//!
//! ```text
//! ScenarioGenerator -> evaluate / scan -> PropertyHarness -> ReportSink
//!                           ^
//!            IdentitySource / ResourceInventory (time-boxed)
//! ```

#![deny(missing_docs)]

mod error;
mod generator;
mod harness;
mod report;
mod sources;

pub use error::{Error, Result};
pub use generator::{Batches, ScenarioGenerator};
pub use harness::{
    HarnessConfig, PropertyHarness, Report, RunPhase, Verdict, DEFAULT_MAX_CONCURRENT_QUERIES,
    DEFAULT_MIN_ITERATIONS, DEFAULT_QUERY_TIMEOUT,
};
pub use report::{exit_code, ReportFormat, ReportSink, EXIT_FAILURE, EXIT_SUCCESS};
pub use sources::{
    fetch_principal, gather_resources, list_resources, IdentitySource, ResourceInventory,
    ResourceProbe,
};
