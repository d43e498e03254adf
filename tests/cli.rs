//! End-to-end CLI tests driving the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    store: std::path::PathBuf,
    skills: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let store = dir.path().join("store");
        let skills = dir.path().join("skills");
        std::fs::create_dir_all(&skills).unwrap();
        Self {
            _dir: dir,
            store,
            skills,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sksnap").unwrap();
        cmd.env("SKSNAP_STORE_DIR", &self.store)
            .env("SKSNAP_SKILLS_DIR", &self.skills)
            .env_remove("SKSNAP_CONFIG")
            .arg("--quiet");
        cmd
    }

    fn write_skill(&self, name: &str, body: &str) {
        let root = self.skills.join(name);
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("SKILL.md"), format!("# {name}\n{body}\n")).unwrap();
    }
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("sksnap").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("sksnap").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_save_requires_init() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "v1");
    fx.cmd()
        .args(["save", "alpha"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_full_save_restore_flow() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "first body");

    fx.cmd().arg("init").assert().success();

    // First save creates v1.
    fx.cmd()
        .args(["save", "alpha", "initial"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha/v1"));

    // Unchanged content is a no-op, not a new version.
    fx.cmd()
        .args(["save", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to save"));

    // Edit, then save v2.
    fx.write_skill("alpha", "second body");
    fx.cmd()
        .args(["save", "alpha", "revised"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha/v2"));

    fx.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha/v1"))
        .stdout(predicate::str::contains("alpha/v2"));

    // Diff against v1 shows the modified manifest.
    fx.cmd()
        .args(["diff", "alpha", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("M SKILL.md"));

    // Restore v1 puts the first body back and backs up the current tree.
    fx.cmd()
        .args(["restore", "alpha", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored alpha/v1"));
    let manifest = std::fs::read_to_string(fx.skills.join("alpha/SKILL.md")).unwrap();
    assert!(manifest.contains("first body"));
    assert!(fx.skills.join(".snapshot-backups").is_dir());

    // After restore the tree matches v1 exactly; diff is clean.
    fx.cmd()
        .args(["diff", "alpha", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No differences"));
}

#[test]
fn test_restore_without_version_lists() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "body");
    fx.cmd().arg("init").assert().success();
    fx.cmd().args(["save", "alpha"]).assert().success();

    fx.cmd()
        .args(["restore", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Versions of alpha"));
}

#[test]
fn test_delete_then_next_save_skips_number() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "one");
    fx.cmd().arg("init").assert().success();
    fx.cmd().args(["save", "alpha"]).assert().success();
    fx.write_skill("alpha", "two");
    fx.cmd().args(["save", "alpha"]).assert().success();

    fx.cmd().args(["delete", "alpha", "v2"]).assert().success();

    // v2 is gone but its number is never reissued.
    fx.write_skill("alpha", "three");
    fx.cmd()
        .args(["save", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha/v3"));
}

#[test]
fn test_backup_scans_and_reports() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "a");
    fx.write_skill("beta", "b");
    fx.cmd().arg("init").assert().success();

    fx.cmd()
        .args(["--json", "backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));

    // Second run finds nothing to do.
    let output = fx
        .cmd()
        .args(["--json", "backup"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["scanned"], Value::from(2));
    assert_eq!(json["saved"].as_array().unwrap().len(), 0);
    assert_eq!(json["unchanged"].as_array().unwrap().len(), 2);
}

#[test]
fn test_json_save_and_error_shapes() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "body");
    fx.cmd().arg("init").assert().success();

    let output = fx
        .cmd()
        .args(["--json", "save", "alpha"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["created"], Value::Bool(true));
    assert_eq!(json["version"], Value::from("alpha/v1"));

    let output = fx
        .cmd()
        .args(["--json", "save", "missing"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"], Value::Bool(true));
    assert_eq!(json["code"], Value::from("skill_not_found"));
}

#[test]
fn test_scan_skips_ineligible_entries() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "a");
    // No manifest, so not a snapshot candidate.
    std::fs::create_dir_all(fx.skills.join("notes")).unwrap();
    std::fs::write(fx.skills.join("notes/readme.txt"), "x").unwrap();

    let output = fx.cmd().args(["--json", "scan"]).output().unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    let skills = json["skills"].as_array().unwrap();
    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0], Value::from("alpha"));
    let skipped = json["skipped"].as_array().unwrap();
    assert!(skipped.iter().any(|s| s["skill"] == Value::from("notes")));
}

#[test]
fn test_status_reports_changed_skills() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "a");
    fx.cmd().arg("init").assert().success();
    fx.cmd().args(["save", "alpha"]).assert().success();
    fx.write_skill("alpha", "a2");

    let output = fx.cmd().args(["--json", "status"]).output().unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["initialized"], Value::Bool(true));
    assert_eq!(json["changed"].as_array().unwrap(), &[Value::from("alpha")]);
}

#[test]
fn test_cache_clear_and_rebuild() {
    let fx = Fixture::new();
    fx.write_skill("alpha", "a");
    fx.cmd().arg("init").assert().success();
    fx.cmd().args(["save", "alpha"]).assert().success();

    fx.cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1"));

    fx.cmd()
        .args(["cache", "rebuild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebuilt 1"));

    // A rebuilt cache sees the unchanged tree as clean again.
    fx.cmd()
        .args(["save", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to save"));
}

#[test]
fn test_self_skill_is_protected() {
    let fx = Fixture::new();
    fx.write_skill("skill-snapshot", "me");
    fx.cmd().arg("init").assert().success();

    fx.cmd()
        .args(["save", "skill-snapshot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("skill-snapshot"));
}
