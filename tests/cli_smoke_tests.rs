use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_wizards() {
    Command::cargo_bin("careportal_cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: careportal_cli"))
        .stdout(predicate::str::contains("practitioner"));
}

#[test]
fn version_prints_build_metadata() {
    Command::cargo_bin("careportal_cli")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "careportal {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn unknown_wizard_fails_with_usage_hint() {
    Command::cargo_bin("careportal_cli")
        .unwrap()
        .arg("billing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown wizard `billing`"));
}
