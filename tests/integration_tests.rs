//! Integration tests for the CLI surface

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_all_subcommands() {
    Command::cargo_bin("pilot")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("amend")
                .and(predicate::str::contains("merge"))
                .and(predicate::str::contains("opened"))
                .and(predicate::str::contains("merged"))
                .and(predicate::str::contains("doctor")),
        );
}

#[test]
fn version_prints() {
    Command::cargo_bin("pilot")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pilot"));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("pilot")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn merged_rejects_non_numeric_days() {
    Command::cargo_bin("pilot")
        .unwrap()
        .args(["merged", "--days", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn merge_help_shows_the_flags() {
    Command::cargo_bin("pilot")
        .unwrap()
        .args(["merge", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--flux")
                .and(predicate::str::contains("--confirm"))
                .and(predicate::str::contains("--wait"))
                .and(predicate::str::contains("--admin")),
        );
}

// --confirm suppresses the prompt rather than adding one
#[test]
fn merge_confirm_flag_skips_the_prompt() {
    Command::cargo_bin("pilot")
        .unwrap()
        .args(["merge", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skip the confirmation prompt"));
}
