//! End-to-end runs of the CLI against files on disk
//!
//! Each test writes a trust policy and optional inventory into a temp dir,
//! parses real argv, and checks the exit code the binary would return.

use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use irsa_cli::{Cli, Error};

const ROLE: &str = "arn:aws:iam::123456789012:role/harbor-s3";
const ISSUER: &str = "oidc.eks.us-west-2.amazonaws.com/id/ABC123";

// =============================================================================
// Fixtures
// =============================================================================

fn trust_document(namespace: &str, service_account: &str) -> String {
    format!(
        r#"{{
  "Version": "2012-10-17",
  "Statement": [{{
    "Effect": "Allow",
    "Principal": {{"Federated": "arn:aws:iam::123456789012:oidc-provider/{issuer}"}},
    "Action": "sts:AssumeRoleWithWebIdentity",
    "Condition": {{"StringEquals": {{
      "{issuer}:sub": "system:serviceaccount:{ns}:{sa}",
      "{issuer}:aud": "sts.amazonaws.com"
    }}}}
  }}]
}}"#,
        issuer = ISSUER,
        ns = namespace,
        sa = service_account
    )
}

const COMPLIANT_INVENTORY: &str = r#"
- name: harbor-registry-storage
  kind: ObjectStore
  tags: {Environment: workshop, Project: harbor-irsa, ManagedBy: terraform}
  encryptionEnabled: true
  encryptionKeyManaged: CustomerManaged
  publicAccessBlocked: true
  versioningEnabled: true
- name: alias/harbor-s3
  kind: EncryptionKey
  tags: {Environment: workshop, Project: harbor-irsa, ManagedBy: terraform}
  keyRotationEnabled: true
"#;

const UNTAGGED_INVENTORY: &str = r#"
- name: harbor-irsa-workshop
  kind: Cluster
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn p(path: &Path) -> &str {
    path.to_str().unwrap()
}

async fn run(argv: &[&str]) -> Result<u8, Error> {
    let mut full = vec!["irsa-verify"];
    full.extend_from_slice(argv);
    Cli::try_parse_from(full).unwrap().run().await
}

async fn verify(policy: &Path, extra: &[&str]) -> Result<u8, Error> {
    let mut argv = vec![
        "verify",
        "--canonical-namespace",
        "harbor",
        "--canonical-service-account",
        "harbor-registry",
        "--role-arn",
        ROLE,
        "--trust-policy",
        p(policy),
        "--seed",
        "42",
    ];
    argv.extend_from_slice(extra);
    run(&argv).await
}

// =============================================================================
// verify
// =============================================================================

#[tokio::test]
async fn test_verify_correct_policy_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("harbor", "harbor-registry"));
    let inventory = write(&dir, "inventory.yaml", COMPLIANT_INVENTORY);

    assert_eq!(verify(&policy, &["--inventory", p(&inventory)]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_verify_wrong_namespace_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("default", "harbor-registry"));

    assert_eq!(verify(&policy, &[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_verify_noncompliant_inventory_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("harbor", "harbor-registry"));
    let inventory = write(&dir, "inventory.yaml", UNTAGGED_INVENTORY);

    assert_eq!(
        verify(&policy, &["--inventory", p(&inventory), "--output", "json"])
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_verify_too_few_iterations_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("harbor", "harbor-registry"));

    assert_eq!(verify(&policy, &["--iterations", "3"]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_verify_config_lowers_minimum() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("harbor", "harbor-registry"));
    let config = write(&dir, "config.yaml", "minIterations: 3\n");

    assert_eq!(
        verify(&policy, &["--iterations", "3", "--config", p(&config)])
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_verify_wildcard_policy_is_precondition() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(
        &dir,
        "trust.json",
        &trust_document("harbor", "*").replace("StringEquals", "StringLike"),
    );

    let err = verify(&policy, &[]).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_verify_missing_policy_is_precondition() {
    let dir = tempfile::tempdir().unwrap();
    let err = verify(&dir.path().join("absent.json"), &[]).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_verify_rejects_audience_with_live() {
    for live in [&["--live"][..], &["--kubeconfig", "/tmp/kubeconfig"][..]] {
        let mut argv = vec![
            "irsa-verify",
            "verify",
            "--canonical-namespace",
            "harbor",
            "--canonical-service-account",
            "harbor-registry",
            "--role-arn",
            ROLE,
            "--trust-policy",
            "trust.json",
            "--audience",
            "vault",
        ];
        argv.extend_from_slice(live);

        let err = Cli::try_parse_from(argv).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}

// =============================================================================
// scan
// =============================================================================

#[tokio::test]
async fn test_scan_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(&dir, "good.yaml", COMPLIANT_INVENTORY);
    let bad = write(&dir, "bad.yaml", UNTAGGED_INVENTORY);

    assert_eq!(run(&["scan", "--inventory", p(&good)]).await.unwrap(), 0);
    assert_eq!(run(&["scan", "--inventory", p(&bad)]).await.unwrap(), 1);
    assert_eq!(
        run(&["scan", "--inventory", p(&bad), "--required-tag", "Owner"])
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_scan_malformed_snapshot_is_precondition() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(&dir, "bad.yaml", "- kind: Cluster\n");

    let err = run(&["scan", "--inventory", p(&bad)]).await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

// =============================================================================
// evaluate
// =============================================================================

#[tokio::test]
async fn test_evaluate_allow_and_deny() {
    let dir = tempfile::tempdir().unwrap();
    let policy = write(&dir, "trust.json", &trust_document("harbor", "harbor-registry"));

    let base = [
        "evaluate",
        "--role-arn",
        ROLE,
        "--trust-policy",
        p(&policy),
        "--namespace",
        "harbor",
        "--service-account",
        "harbor-registry",
    ];

    let mut allowed = base.to_vec();
    allowed.extend_from_slice(&["--role-annotation", ROLE]);
    assert_eq!(run(&allowed).await.unwrap(), 0);

    // no annotation
    assert_eq!(run(&base).await.unwrap(), 1);
}
