//! Seeded scenario generation
//!
//! Every iteration produces one batch: the canonical identity plus one
//! perturbation per [`ScenarioKind`]. Each batch has its own RNG seeded from
//! `(seed, iteration)`, so a failing iteration can be replayed alone and the
//! whole sequence is identical for identical seeds.
//!
//! Expected outcomes are derived from identity equality with the canonical
//! principal, never from the evaluator under test.

use rand::prelude::*;

use irsa_model::{Outcome, Principal, Scenario, ScenarioKind};

use crate::{Error, Result};

// =============================================================================
// Name pools
// =============================================================================

const NAMESPACES: &[&str] = &[
    "default",
    "kube-system",
    "kube-public",
    "monitoring",
    "ingress-nginx",
    "payments",
    "staging",
    "dev",
    "tools",
    "logging",
];

const SERVICE_ACCOUNTS: &[&str] = &[
    "default",
    "unauthorized-sa",
    "builder",
    "deployer",
    "metrics-reader",
    "registry",
    "jobservice",
    "ci-runner",
    "backup",
    "attacker",
];

const AUDIENCES: &[&str] = &[
    "https://kubernetes.default.svc",
    "vault",
    "sts.amazonaws.co",
    "STS.amazonaws.com",
    "sts.amazonaws.com.evil",
    "",
];

const SUFFIXES: &[&str] = &["-x", "-admin", "2", "-dev", "-canary", "s"];

const TYPO_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-";

/// Odd multiplier spreading iteration numbers across the seed space
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

// =============================================================================
// Generator
// =============================================================================

/// Deterministic producer of identity scenarios around one canonical principal
#[derive(Clone, Debug)]
pub struct ScenarioGenerator {
    canonical: Principal,
    seed: u64,
}

impl ScenarioGenerator {
    /// Create a generator.
    ///
    /// The canonical principal must be well-formed and annotated; it is the
    /// only identity expected to be allowed.
    pub fn new(canonical: Principal, seed: u64) -> Result<Self> {
        canonical.validate()?;
        if !canonical.has_annotation() {
            return Err(Error::precondition(format!(
                "canonical principal {} has no role annotation",
                canonical
            )));
        }
        Ok(Self { canonical, seed })
    }

    /// Canonical principal
    pub fn canonical(&self) -> &Principal {
        &self.canonical
    }

    /// Seed driving the sequence
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Scenario batch for one iteration (1-based)
    pub fn batch(&self, iteration: u32) -> Vec<Scenario> {
        let mut rng =
            StdRng::seed_from_u64(self.seed ^ u64::from(iteration).wrapping_mul(SEED_MIX));
        ScenarioKind::ALL
            .iter()
            .map(|&kind| {
                let principal = self.perturb(kind, &mut rng);
                let expected = if principal == self.canonical {
                    Outcome::Allow
                } else {
                    Outcome::Deny
                };
                Scenario::new(iteration, kind, principal, expected)
            })
            .collect()
    }

    /// Lazy sequence of batches for iterations `1..=iterations`.
    ///
    /// Calling this again restarts the sequence from the first batch.
    pub fn batches(&self, iterations: u32) -> Batches<'_> {
        Batches {
            generator: self,
            next: 1,
            end: u64::from(iterations),
        }
    }

    /// Flattened scenario sequence for iterations `1..=iterations`
    pub fn scenarios(&self, iterations: u32) -> impl Iterator<Item = Scenario> + '_ {
        self.batches(iterations).flatten()
    }

    fn perturb(&self, kind: ScenarioKind, rng: &mut StdRng) -> Principal {
        let c = &self.canonical;
        match kind {
            ScenarioKind::Canonical => c.clone(),
            ScenarioKind::NamespaceMismatch => Principal {
                namespace: pick_distinct(rng, NAMESPACES, &c.namespace),
                ..c.clone()
            },
            ScenarioKind::ServiceAccountMismatch => Principal {
                service_account: pick_distinct(rng, SERVICE_ACCOUNTS, &c.service_account),
                ..c.clone()
            },
            ScenarioKind::UnrelatedIdentity => Principal::new(
                pick_distinct(rng, NAMESPACES, &c.namespace),
                pick_distinct(rng, SERVICE_ACCOUNTS, &c.service_account),
                c.audience.clone(),
            ),
            ScenarioKind::MissingAnnotation => c.clone().without_annotation(),
            ScenarioKind::AudienceMismatch => Principal {
                audience: pick_distinct(rng, AUDIENCES, &c.audience),
                ..c.clone()
            },
            ScenarioKind::ForeignRole => {
                let role = c.annotated_role().unwrap_or_default();
                let suffix = SUFFIXES.choose(rng).copied().unwrap_or("-x");
                c.clone().annotated(format!("{}{}", role, suffix))
            }
            ScenarioKind::NamespaceTypo => Principal {
                namespace: one_char_typo(rng, &c.namespace),
                ..c.clone()
            },
            ScenarioKind::CaseVariant => {
                if rng.gen_bool(0.5) {
                    Principal {
                        namespace: case_variant(rng, &c.namespace),
                        ..c.clone()
                    }
                } else {
                    Principal {
                        service_account: case_variant(rng, &c.service_account),
                        ..c.clone()
                    }
                }
            }
            ScenarioKind::ServiceAccountSuffix => {
                let suffix = SUFFIXES.choose(rng).copied().unwrap_or("-x");
                Principal {
                    service_account: format!("{}{}", c.service_account, suffix),
                    ..c.clone()
                }
            }
        }
    }
}

/// Lazy, finite, restartable iterator over scenario batches
#[derive(Clone, Debug)]
pub struct Batches<'a> {
    generator: &'a ScenarioGenerator,
    next: u64,
    end: u64,
}

impl Iterator for Batches<'_> {
    type Item = Vec<Scenario>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let iteration = u32::try_from(self.next).ok()?;
        self.next += 1;
        Some(self.generator.batch(iteration))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end + 1).saturating_sub(self.next);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

// =============================================================================
// Perturbations
// =============================================================================

/// Pick a name from `pool`, optionally suffixed, that differs from `avoid`.
fn pick_distinct(rng: &mut StdRng, pool: &[&str], avoid: &str) -> String {
    let base = pool.choose(rng).copied().unwrap_or("default");
    let candidate = if rng.gen_bool(0.3) {
        format!("{}-{}", base, rng.gen_range(0..1000))
    } else {
        base.to_string()
    };
    if candidate != avoid {
        return candidate;
    }
    // pool hit the canonical value; extend it so it can never match
    format!("{}-other", avoid)
}

/// Replace one character of `value` with a different one.
fn one_char_typo(rng: &mut StdRng, value: &str) -> String {
    let mut chars: Vec<char> = value.chars().collect();
    let index = rng.gen_range(0..chars.len());
    let original = chars[index];
    let replacement = loop {
        let c = char::from(TYPO_ALPHABET[rng.gen_range(0..TYPO_ALPHABET.len())]);
        if c != original {
            break c;
        }
    };
    chars[index] = replacement;
    chars.into_iter().collect()
}

/// Flip the case of one alphabetic character, or uppercase-append if there is none.
fn case_variant(rng: &mut StdRng, value: &str) -> String {
    let letters: Vec<usize> = value
        .char_indices()
        .filter(|(_, c)| c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .collect();
    let Some(&index) = letters.choose(rng) else {
        return format!("{}X", value);
    };
    value
        .char_indices()
        .map(|(i, c)| {
            if i != index {
                c
            } else if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
