//! End-to-end smoke tests for the `cork` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cork(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cork").expect("binary builds");
    cmd.arg("--dir").arg(dir.path()).arg("--actor").arg("tester");
    cmd
}

#[test]
fn full_alias_lifecycle() {
    let dir = TempDir::new().unwrap();

    cork(&dir).arg("init").assert().success();

    cork(&dir)
        .args(["post", "1", "aaa", "bbb", "ccc"])
        .assert()
        .success();
    cork(&dir)
        .args(["post", "2", "bbb", "ccc", "ddd"])
        .assert()
        .success();
    cork(&dir)
        .args(["post", "3", "ccc", "ddd", "eee"])
        .assert()
        .success();

    cork(&dir)
        .args(["propose", "alias", "aaa", "bbb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));

    cork(&dir)
        .args(["approve", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated"));

    cork(&dir)
        .args(["post", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bbb ccc").and(predicate::str::contains("aaa").not()));

    cork(&dir)
        .args(["show", "1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"active\""));

    cork(&dir).args(["undo", "1"]).assert().success();

    cork(&dir)
        .args(["post", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aaa bbb ccc"));
}

#[test]
fn validation_errors_reach_the_user() {
    let dir = TempDir::new().unwrap();
    cork(&dir).arg("init").assert().success();

    cork(&dir)
        .args(["propose", "alias", "aaa", "aaa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("itself"));

    cork(&dir)
        .args(["propose", "implication", "aaa", "bbb"])
        .assert()
        .success();
    cork(&dir)
        .args(["propose", "implication", "bbb", "aaa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular relation"));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();

    cork(&dir)
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn list_shows_relationships() {
    let dir = TempDir::new().unwrap();
    cork(&dir).arg("init").assert().success();
    cork(&dir)
        .args(["propose", "alias", "aaa", "bbb", "--no-forum"])
        .assert()
        .success();

    cork(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("aaa -> bbb"));

    cork(&dir)
        .args(["list", "--status", "active"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no relationships"));
}
