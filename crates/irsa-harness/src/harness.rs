//! Property test harness
//!
//! Checks the universal invariant that a principal is allowed if and only if
//! it is the canonical principal, across every generated scenario, and scans
//! every resource snapshot for compliance violations.
//!
//! # Run Lifecycle
//!
//! ```text
//! Idle -> Generating -> Evaluating -> Aggregating -> Reported(Success | Failure)
//! ```
//!
//! A failing scenario is recorded, never retried: the property is a one-shot
//! logical check. Results live in an append-only list owned by one run;
//! counts are derived from it after evaluation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use irsa_model::{Outcome, Principal, ResourceDescriptor, TestResult, TrustPolicy};
use irsa_policy::{evaluate, ComplianceRules, ComplianceScanner};

use crate::generator::ScenarioGenerator;
use crate::sources::{gather_resources, list_resources, ResourceInventory, ResourceProbe};
use crate::Result;

/// Fewest iterations that give confidence in the property check
pub const DEFAULT_MIN_ITERATIONS: u32 = 10;

/// Default deadline for each external query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of concurrent inventory queries
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 4;

// =============================================================================
// Configuration
// =============================================================================

/// Harness settings
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Runs with fewer iterations fail with insufficient coverage
    pub min_iterations: u32,
    /// Seed for scenario generation
    pub seed: u64,
    /// Deadline for each external query
    pub query_timeout: Duration,
    /// Maximum concurrent inventory queries
    pub max_concurrent_queries: usize,
    /// Compliance rules for resource scans
    pub rules: ComplianceRules,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            min_iterations: DEFAULT_MIN_ITERATIONS,
            seed: 0,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            rules: ComplianceRules::default(),
        }
    }
}

// =============================================================================
// Run state
// =============================================================================

/// Terminal verdict of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Every check passed with sufficient coverage
    Success,
    /// At least one check failed, coverage was insufficient, or the run was cancelled
    Failure,
}

/// Harness lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// No run started
    Idle,
    /// Validating inputs and building the scenario generator
    Generating,
    /// Evaluating scenarios and scanning resources
    Evaluating,
    /// Deriving counts from recorded results
    Aggregating,
    /// Report produced
    Reported(Verdict),
}

/// Outcome of a harness run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Seed used for generation
    pub seed: u64,
    /// Iterations requested
    pub iterations_requested: u32,
    /// Iterations actually evaluated
    pub iterations_completed: u32,
    /// Configured minimum iterations
    pub min_iterations: u32,
    /// Per-scenario results in generation order
    pub scenario_results: Vec<TestResult>,
    /// Per-resource results in inventory order
    pub resource_results: Vec<TestResult>,
    /// Passing result count
    pub passed: usize,
    /// Failing result count
    pub failed: usize,
    /// Iterations requested were below the minimum
    pub insufficient_coverage: bool,
    /// Run stopped early on cancellation
    pub cancelled: bool,
    /// Terminal verdict
    pub verdict: Verdict,
}

impl Report {
    /// Total recorded results
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// Fraction of passing results, 0.0 when nothing ran
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.passed as f64 / self.total() as f64
        }
    }

    /// Every failing result, scenarios first
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.scenario_results
            .iter()
            .chain(self.resource_results.iter())
            .filter(|r| !r.passed)
    }

    /// Whether the run succeeded
    pub fn is_success(&self) -> bool {
        self.verdict == Verdict::Success
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Orchestrates scenario generation, evaluation, and compliance scanning
#[derive(Debug)]
pub struct PropertyHarness {
    config: HarnessConfig,
    scanner: ComplianceScanner,
    phase: RunPhase,
}

impl PropertyHarness {
    /// Create a harness
    pub fn new(config: HarnessConfig) -> Self {
        let scanner = ComplianceScanner::new(config.rules.clone());
        Self {
            config,
            scanner,
            phase: RunPhase::Idle,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Configuration in use
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the property check and scan the given resource snapshots.
    ///
    /// Fails only on precondition errors (malformed policy or canonical
    /// principal); every check failure is recorded in the report instead.
    pub fn run(
        &mut self,
        iterations: u32,
        canonical: &Principal,
        policy: &TrustPolicy,
        resources: &[ResourceDescriptor],
    ) -> Result<Report> {
        let probes: Vec<_> = resources
            .iter()
            .cloned()
            .map(ResourceProbe::Described)
            .collect();
        self.run_probes(
            iterations,
            canonical,
            policy,
            probes,
            &CancellationToken::new(),
        )
    }

    /// Run against a live inventory, querying every listed resource under the
    /// configured deadline and concurrency bound.
    #[instrument(skip_all, fields(iterations = iterations, seed = self.config.seed))]
    pub async fn run_with_inventory(
        &mut self,
        iterations: u32,
        canonical: &Principal,
        policy: &TrustPolicy,
        inventory: &dyn ResourceInventory,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        let ids = list_resources(inventory, self.config.query_timeout).await?;
        info!(count = ids.len(), "Querying resource inventory");
        let probes = gather_resources(
            inventory,
            &ids,
            self.config.query_timeout,
            self.config.max_concurrent_queries,
            cancel,
        )
        .await;
        self.run_probes(iterations, canonical, policy, probes, cancel)
    }

    /// Run with pre-gathered probes, honoring cancellation between iterations.
    pub fn run_probes(
        &mut self,
        iterations: u32,
        canonical: &Principal,
        policy: &TrustPolicy,
        probes: Vec<ResourceProbe>,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        self.transition(RunPhase::Generating);
        let generator = match self.prepare(canonical, policy) {
            Ok(g) => g,
            Err(e) => {
                error!(error = %e, "Precondition failed, aborting run");
                self.phase = RunPhase::Idle;
                return Err(e);
            }
        };

        self.transition(RunPhase::Evaluating);
        let mut scenario_results = Vec::new();
        let mut completed = 0;
        let mut cancelled = false;

        for batch in generator.batches(iterations) {
            if cancel.is_cancelled() {
                warn!(completed, iterations, "Run cancelled, skipping remaining iterations");
                cancelled = true;
                break;
            }
            for scenario in &batch {
                let result = match evaluate(&scenario.principal, policy) {
                    Ok(decision) => {
                        TestResult::evaluated(scenario, decision.outcome(), decision.to_string())
                    }
                    Err(e) => {
                        TestResult::precondition(&scenario.id, scenario.expected, e.to_string())
                    }
                };
                if !result.passed {
                    warn!(
                        scenario = %result.scenario_id,
                        expected = %result.expected_outcome,
                        actual = %result.actual_outcome,
                        detail = %result.detail,
                        "Scenario failed"
                    );
                }
                scenario_results.push(result);
            }
            completed += 1;
            debug!(iteration = completed, "Iteration evaluated");
        }
        if cancel.is_cancelled() && completed < iterations {
            cancelled = true;
        }

        let resource_results = self.scan_probes(probes);

        self.transition(RunPhase::Aggregating);
        let insufficient_coverage = iterations < self.config.min_iterations;
        if insufficient_coverage {
            warn!(
                iterations,
                min_iterations = self.config.min_iterations,
                "InsufficientCoverage: too few iterations for the property check"
            );
            scenario_results.push(TestResult::insufficient_coverage(
                iterations,
                self.config.min_iterations,
            ));
        }
        if cancelled {
            scenario_results.push(TestResult::cancelled(format!(
                "cancelled after {} of {} iterations",
                completed, iterations
            )));
        }

        let (passed, failed) = tally(&scenario_results, &resource_results);
        let verdict = verdict_for(failed);

        let report = Report {
            seed: generator.seed(),
            iterations_requested: iterations,
            iterations_completed: completed,
            min_iterations: self.config.min_iterations,
            scenario_results,
            resource_results,
            passed,
            failed,
            insufficient_coverage,
            cancelled,
            verdict,
        };

        self.transition(RunPhase::Reported(verdict));
        info!(
            passed = report.passed,
            failed = report.failed,
            verdict = ?verdict,
            "Verification run finished"
        );
        Ok(report)
    }

    /// Scan resources only, with no property check.
    ///
    /// Coverage does not apply, so the verdict depends on violations and
    /// cancellation alone.
    pub fn scan_only(&mut self, probes: Vec<ResourceProbe>, cancel: &CancellationToken) -> Report {
        self.transition(RunPhase::Evaluating);
        let mut resource_results = self.scan_probes(probes);

        self.transition(RunPhase::Aggregating);
        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                scanned = resource_results.len(),
                "Scan cancelled before every resource was queried"
            );
            resource_results.push(TestResult::cancelled(
                "cancelled before every resource was queried",
            ));
        }
        let (passed, failed) = tally(&[], &resource_results);
        let verdict = verdict_for(failed);

        self.transition(RunPhase::Reported(verdict));
        info!(passed, failed, verdict = ?verdict, "Compliance scan finished");
        Report {
            seed: self.config.seed,
            iterations_requested: 0,
            iterations_completed: 0,
            min_iterations: 0,
            scenario_results: Vec::new(),
            resource_results,
            passed,
            failed,
            insufficient_coverage: false,
            cancelled,
            verdict,
        }
    }

    /// Query every inventory resource and scan it, with no property check.
    #[instrument(skip_all)]
    pub async fn scan_inventory(
        &mut self,
        inventory: &dyn ResourceInventory,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        let ids = list_resources(inventory, self.config.query_timeout).await?;
        let probes = gather_resources(
            inventory,
            &ids,
            self.config.query_timeout,
            self.config.max_concurrent_queries,
            cancel,
        )
        .await;
        Ok(self.scan_only(probes, cancel))
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn prepare(&self, canonical: &Principal, policy: &TrustPolicy) -> Result<ScenarioGenerator> {
        policy.validate()?;
        ScenarioGenerator::new(canonical.clone(), self.config.seed)
    }

    fn scan_probes(&self, probes: Vec<ResourceProbe>) -> Vec<TestResult> {
        let mut results = Vec::new();
        for probe in probes {
            match probe {
                ResourceProbe::Described(resource) => {
                    let id = resource.id();
                    if let Err(e) = resource.validate() {
                        results.push(TestResult::precondition(
                            id,
                            Outcome::Compliant,
                            e.to_string(),
                        ));
                        continue;
                    }
                    let violations = self.scanner.scan(&resource);
                    if violations.is_empty() {
                        results.push(TestResult::compliant(id));
                    } else {
                        results.extend(
                            violations
                                .iter()
                                .map(|v| TestResult::violation(id.clone(), v.to_string())),
                        );
                    }
                }
                ResourceProbe::TimedOut(id) => {
                    results.push(TestResult::timeout(id, Outcome::Compliant));
                }
                ResourceProbe::Failed { id, message } => {
                    results.push(TestResult::precondition(id, Outcome::Compliant, message));
                }
            }
        }
        results
    }

    fn transition(&mut self, next: RunPhase) {
        info!(from = ?self.phase, to = ?next, "Harness phase transition");
        self.phase = next;
    }
}

/// Passing and failing counts across both result lists
fn tally(scenarios: &[TestResult], resources: &[TestResult]) -> (usize, usize) {
    let total = scenarios.len() + resources.len();
    let passed = scenarios
        .iter()
        .chain(resources.iter())
        .filter(|r| r.passed)
        .count();
    (passed, total - passed)
}

/// A run succeeds iff nothing failed; coverage and cancellation are failures.
fn verdict_for(failed: usize) -> Verdict {
    if failed == 0 {
        Verdict::Success
    } else {
        Verdict::Failure
    }
}

// =============================================================================
// Tests
// =============================================================================
