//! Verification settings loaded from an optional YAML file.
//!
//! Resolution (highest priority first):
//! 1. Command-line flags
//! 2. `--config <path>` or the `IRSA_VERIFY_CONFIG` environment variable
//! 3. Built-in defaults
//!
//! ```yaml
//! minIterations: 20
//! queryTimeoutSecs: 5
//! maxConcurrentQueries: 8
//! requiredTags: [Environment, Project, ManagedBy, Owner]
//! maxAttachedPolicies: 3
//! audience: sts.amazonaws.com
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use irsa_harness::{
    HarnessConfig, DEFAULT_MAX_CONCURRENT_QUERIES, DEFAULT_MIN_ITERATIONS, DEFAULT_QUERY_TIMEOUT,
};
use irsa_model::DEFAULT_AUDIENCE;
use irsa_policy::{ComplianceRules, DEFAULT_MAX_ATTACHED_POLICIES, DEFAULT_REQUIRED_TAGS};

use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "IRSA_VERIFY_CONFIG";

/// File-level verification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Fewest iterations accepted as sufficient coverage
    pub min_iterations: u32,
    /// Deadline for each identity or inventory query
    pub query_timeout_secs: u64,
    /// Concurrent inventory queries
    pub max_concurrent_queries: usize,
    /// Tags every resource must carry
    pub required_tags: Vec<String>,
    /// Attached policy limit for identity roles
    pub max_attached_policies: u32,
    /// Token audience assumed for the canonical principal
    pub audience: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_iterations: DEFAULT_MIN_ITERATIONS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            required_tags: DEFAULT_REQUIRED_TAGS.iter().map(|t| t.to_string()).collect(),
            max_attached_policies: DEFAULT_MAX_ATTACHED_POLICIES,
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }
}

impl VerifyConfig {
    /// Load from `path`, or return defaults when no path is given.
    ///
    /// An explicitly named file that is missing is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;
        let config: Self = serde_yaml::from_str(&data)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded verification config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.query_timeout_secs == 0 {
            return Err(Error::validation("queryTimeoutSecs must be at least 1"));
        }
        if self.max_concurrent_queries == 0 {
            return Err(Error::validation("maxConcurrentQueries must be at least 1"));
        }
        if self.audience.is_empty() {
            return Err(Error::validation("audience must not be empty"));
        }
        Ok(())
    }

    /// Compliance rules from this config
    pub fn rules(&self) -> ComplianceRules {
        ComplianceRules {
            required_tags: self.required_tags.clone(),
            max_attached_policies: self.max_attached_policies,
        }
    }

    /// Per-query deadline
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Harness settings for a run with `seed`
    pub fn harness_config(&self, seed: u64) -> HarnessConfig {
        HarnessConfig {
            min_iterations: self.min_iterations,
            seed,
            query_timeout: self.query_timeout(),
            max_concurrent_queries: self.max_concurrent_queries,
            rules: self.rules(),
        }
    }
}
