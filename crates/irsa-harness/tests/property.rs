//! Property tests for the verification engine
//!
//! These check the universal claims the harness itself relies on, over
//! arbitrary identities, resources, and seeds rather than the generator's
//! fixed name pools.

use proptest::prelude::*;

use irsa_harness::{HarnessConfig, PropertyHarness, ScenarioGenerator, Verdict};
use irsa_model::{
    KeyManagement, Outcome, Principal, ResourceDescriptor, ResourceKind, ScenarioKind,
    TrustPolicy, TrustStatement,
};
use irsa_policy::{evaluate, ComplianceScanner};

const ROLE: &str = "arn:aws:iam::123456789012:role/harbor-s3";
const PROVIDER: &str =
    "arn:aws:iam::123456789012:oidc-provider/oidc.eks.us-west-2.amazonaws.com/id/ABC123";
const AUD: &str = "sts.amazonaws.com";

fn canonical() -> Principal {
    Principal::new("harbor", "harbor-registry", AUD).annotated(ROLE)
}

fn policy_for(ns: &str, sa: &str) -> TrustPolicy {
    TrustPolicy::new(
        ROLE,
        vec![TrustStatement::for_service_account(PROVIDER, ns, sa, AUD)],
    )
}

fn correct_policy() -> TrustPolicy {
    policy_for("harbor", "harbor-registry")
}

// =============================================================================
// Strategies
// =============================================================================

/// Names biased toward the canonical ones so matches actually occur
fn arb_name(canonical: &'static str) -> impl Strategy<Value = String> {
    prop_oneof![
        2 => Just(canonical.to_string()),
        1 => Just(canonical.to_uppercase()),
        3 => "[a-z][a-z0-9-]{0,15}",
    ]
}

fn arb_principal() -> impl Strategy<Value = Principal> {
    (
        arb_name("harbor"),
        arb_name("harbor-registry"),
        prop_oneof![3 => Just(AUD.to_string()), 1 => "[a-z.]{1,20}"],
        prop_oneof![
            3 => Just(Some(ROLE.to_string())),
            1 => Just(None),
            1 => Just(Some(format!("{}-admin", ROLE))),
        ],
    )
        .prop_map(|(ns, sa, aud, role)| {
            let p = Principal::new(ns, sa, aud);
            match role {
                Some(role) => p.annotated(role),
                None => p,
            }
        })
}

fn arb_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::ObjectStore),
        Just(ResourceKind::EncryptionKey),
        Just(ResourceKind::IdentityRole),
        Just(ResourceKind::Cluster),
    ]
}

fn arb_key_management() -> impl Strategy<Value = KeyManagement> {
    prop_oneof![
        Just(KeyManagement::None),
        Just(KeyManagement::ProviderManaged),
        Just(KeyManagement::CustomerManaged),
    ]
}

fn arb_resource() -> impl Strategy<Value = ResourceDescriptor> {
    (
        arb_kind(),
        proptest::collection::btree_set(
            prop_oneof![
                Just("Environment"),
                Just("Project"),
                Just("ManagedBy"),
                Just("Owner"),
            ],
            0..4,
        ),
        any::<[bool; 5]>(),
        arb_key_management(),
        0u32..6,
    )
        .prop_map(|(kind, tags, flags, key, policies)| {
            let mut r = ResourceDescriptor::new("resource", kind);
            for tag in tags {
                r = r.with_tag(tag, "value");
            }
            r.encryption_enabled = flags[0];
            r.key_rotation_enabled = flags[1];
            r.public_access_blocked = flags[2];
            r.versioning_enabled = flags[3];
            r.uses_managed_broad_policy = flags[4];
            r.encryption_key_managed = key;
            r.attached_policy_count = policies;
            r
        })
}

/// Every rule of the default rule set, restated independently of the scanner
fn meets_every_rule(r: &ResourceDescriptor) -> bool {
    let tagged = ["Environment", "Project", "ManagedBy"]
        .iter()
        .all(|t| r.tags.contains_key(*t));
    let kind_ok = match r.kind {
        ResourceKind::ObjectStore => {
            r.encryption_enabled
                && r.encryption_key_managed == KeyManagement::CustomerManaged
                && r.public_access_blocked
                && r.versioning_enabled
        }
        ResourceKind::EncryptionKey => r.key_rotation_enabled,
        ResourceKind::IdentityRole => r.attached_policy_count <= 3 && !r.uses_managed_broad_policy,
        ResourceKind::Cluster | ResourceKind::Unmodeled => true,
    };
    tagged && kind_ok
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn allowed_iff_canonical(principal in arb_principal()) {
        let decision = evaluate(&principal, &correct_policy()).unwrap();
        prop_assert_eq!(decision.is_allowed(), principal == canonical());
    }

    #[test]
    fn compliant_iff_every_rule_holds(resource in arb_resource()) {
        let violations = ComplianceScanner::default().scan(&resource);
        prop_assert_eq!(violations.is_empty(), meets_every_rule(&resource));
    }

    #[test]
    fn generated_expectations_match_identity(seed in any::<u64>(), iteration in 1u32..50) {
        let generator = ScenarioGenerator::new(canonical(), seed).unwrap();
        for scenario in generator.batch(iteration) {
            let expected = if scenario.principal == canonical() {
                Outcome::Allow
            } else {
                Outcome::Deny
            };
            prop_assert_eq!(scenario.expected, expected);
            prop_assert_eq!(scenario.kind == ScenarioKind::Canonical, expected == Outcome::Allow);
        }
    }

    #[test]
    fn correct_policy_always_succeeds(seed in any::<u64>(), iterations in 10u32..30) {
        let mut harness = PropertyHarness::new(HarnessConfig { seed, ..Default::default() });
        let report = harness.run(iterations, &canonical(), &correct_policy(), &[]).unwrap();
        prop_assert_eq!(report.verdict, Verdict::Success);
        prop_assert!(report.scenario_results.len() >= iterations as usize);
    }

    #[test]
    fn same_seed_same_report(seed in any::<u64>(), iterations in 1u32..20) {
        let run = || {
            PropertyHarness::new(HarnessConfig { seed, ..Default::default() })
                .run(iterations, &canonical(), &correct_policy(), &[])
                .unwrap()
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn broken_policy_never_hides_failures(
        seed in any::<u64>(),
        ns in "[a-z][a-z0-9-]{0,10}",
        sa in "[a-z][a-z0-9-]{0,10}",
    ) {
        let config = HarnessConfig { seed, ..Default::default() };
        let good = PropertyHarness::new(config.clone())
            .run(10, &canonical(), &correct_policy(), &[])
            .unwrap();
        let other = PropertyHarness::new(config)
            .run(10, &canonical(), &policy_for(&ns, &sa), &[])
            .unwrap();

        prop_assert!(other.failed >= good.failed);
        if ns != "harbor" || sa != "harbor-registry" {
            prop_assert_eq!(other.verdict, Verdict::Failure);
        }
    }
}
