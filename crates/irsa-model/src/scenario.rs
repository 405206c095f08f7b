//! Generated test cases and their recorded results

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Which identity perturbation a scenario exercises
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Exact canonical identity, correctly annotated
    Canonical,
    /// Canonical ServiceAccount name in another namespace
    NamespaceMismatch,
    /// Canonical namespace with another ServiceAccount name
    ServiceAccountMismatch,
    /// Unrelated namespace and ServiceAccount, no annotation
    UnrelatedIdentity,
    /// Canonical identity without the role annotation
    MissingAnnotation,
    /// Canonical identity presenting a token for another audience
    AudienceMismatch,
    /// Canonical identity annotated with a different role
    ForeignRole,
    /// Namespace differing from canonical by one character
    NamespaceTypo,
    /// Canonical identity with different letter case
    CaseVariant,
    /// Canonical ServiceAccount name with extra characters appended
    ServiceAccountSuffix,
}

impl ScenarioKind {
    /// Every kind, in the order a batch emits them
    pub const ALL: [ScenarioKind; 10] = [
        ScenarioKind::Canonical,
        ScenarioKind::NamespaceMismatch,
        ScenarioKind::ServiceAccountMismatch,
        ScenarioKind::UnrelatedIdentity,
        ScenarioKind::MissingAnnotation,
        ScenarioKind::AudienceMismatch,
        ScenarioKind::ForeignRole,
        ScenarioKind::NamespaceTypo,
        ScenarioKind::CaseVariant,
        ScenarioKind::ServiceAccountSuffix,
    ];

    /// Kebab-case name used in scenario ids
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::Canonical => "canonical",
            ScenarioKind::NamespaceMismatch => "namespace-mismatch",
            ScenarioKind::ServiceAccountMismatch => "service-account-mismatch",
            ScenarioKind::UnrelatedIdentity => "unrelated-identity",
            ScenarioKind::MissingAnnotation => "missing-annotation",
            ScenarioKind::AudienceMismatch => "audience-mismatch",
            ScenarioKind::ForeignRole => "foreign-role",
            ScenarioKind::NamespaceTypo => "namespace-typo",
            ScenarioKind::CaseVariant => "case-variant",
            ScenarioKind::ServiceAccountSuffix => "service-account-suffix",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed or expected result of one check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Credentials would be issued
    Allow,
    /// Credentials would be refused
    Deny,
    /// Resource satisfies every applicable rule
    Compliant,
    /// Resource violates a rule
    NonCompliant,
    /// External query exceeded its deadline
    Timeout,
    /// Input was malformed and could not be evaluated
    Invalid,
    /// Run covered everything it had to
    Complete,
    /// Run stopped short of the coverage it needed
    Incomplete,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Allow => "Allow",
            Outcome::Deny => "Deny",
            Outcome::Compliant => "Compliant",
            Outcome::NonCompliant => "NonCompliant",
            Outcome::Timeout => "Timeout",
            Outcome::Invalid => "Invalid",
            Outcome::Complete => "Complete",
            Outcome::Incomplete => "Incomplete",
        };
        f.write_str(s)
    }
}

/// One generated identity check with its expected outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Unique id within a run, `iter-<n>/<kind>`
    pub id: String,
    /// Iteration that produced this scenario (1-based)
    pub iteration: u32,
    /// Perturbation applied to the canonical identity
    pub kind: ScenarioKind,
    /// Principal to evaluate
    pub principal: Principal,
    /// Outcome the trust policy must produce
    pub expected: Outcome,
}

impl Scenario {
    /// Create a scenario, deriving its id from iteration and kind
    pub fn new(
        iteration: u32,
        kind: ScenarioKind,
        principal: Principal,
        expected: Outcome,
    ) -> Self {
        Self {
            id: format!("iter-{}/{}", iteration, kind),
            iteration,
            kind,
            principal,
            expected,
        }
    }
}

/// Why a result failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Trust decision differed from the expected outcome
    EvaluationMismatch,
    /// Resource broke a compliance rule
    ComplianceViolation,
    /// External query timed out
    Timeout,
    /// Input was malformed or a collaborator was unavailable
    Precondition,
    /// Fewer iterations ran than the configured minimum
    InsufficientCoverage,
    /// Run was interrupted before every check was scheduled
    Cancelled,
}

/// Recorded outcome of one scenario or resource check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Scenario id or resource id
    pub scenario_id: String,
    /// What happened
    pub actual_outcome: Outcome,
    /// What should have happened
    pub expected_outcome: Outcome,
    /// Whether actual matched expected
    pub passed: bool,
    /// Human-readable reason
    pub detail: String,
    /// Failure classification, absent for passing results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl TestResult {
    /// Result of a trust decision compared against its scenario
    pub fn evaluated(scenario: &Scenario, actual: Outcome, detail: impl Into<String>) -> Self {
        let passed = actual == scenario.expected;
        Self {
            scenario_id: scenario.id.clone(),
            actual_outcome: actual,
            expected_outcome: scenario.expected,
            passed,
            detail: detail.into(),
            failure: (!passed).then_some(FailureKind::EvaluationMismatch),
        }
    }

    /// Passing result for a resource with no violations
    pub fn compliant(resource_id: impl Into<String>) -> Self {
        Self {
            scenario_id: resource_id.into(),
            actual_outcome: Outcome::Compliant,
            expected_outcome: Outcome::Compliant,
            passed: true,
            detail: "compliant".to_string(),
            failure: None,
        }
    }

    /// Failing result for one compliance violation
    pub fn violation(resource_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            scenario_id: resource_id.into(),
            actual_outcome: Outcome::NonCompliant,
            expected_outcome: Outcome::Compliant,
            passed: false,
            detail: detail.into(),
            failure: Some(FailureKind::ComplianceViolation),
        }
    }

    /// Failing result for a query that exceeded its deadline
    pub fn timeout(id: impl Into<String>, expected: Outcome) -> Self {
        Self {
            scenario_id: id.into(),
            actual_outcome: Outcome::Timeout,
            expected_outcome: expected,
            passed: false,
            detail: "timeout".to_string(),
            failure: Some(FailureKind::Timeout),
        }
    }

    /// Failing result for malformed input or an unavailable collaborator
    pub fn precondition(
        id: impl Into<String>,
        expected: Outcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            scenario_id: id.into(),
            actual_outcome: Outcome::Invalid,
            expected_outcome: expected,
            passed: false,
            detail: detail.into(),
            failure: Some(FailureKind::Precondition),
        }
    }

    /// Run-level failure for too few iterations
    pub fn insufficient_coverage(requested: u32, minimum: u32) -> Self {
        Self {
            scenario_id: "coverage".to_string(),
            actual_outcome: Outcome::Incomplete,
            expected_outcome: Outcome::Complete,
            passed: false,
            detail: format!("InsufficientCoverage: {} < {}", requested, minimum),
            failure: Some(FailureKind::InsufficientCoverage),
        }
    }

    /// Run-level failure for an interrupted run
    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self {
            scenario_id: "cancelled".to_string(),
            actual_outcome: Outcome::Incomplete,
            expected_outcome: Outcome::Complete,
            passed: false,
            detail: detail.into(),
            failure: Some(FailureKind::Cancelled),
        }
    }
}
