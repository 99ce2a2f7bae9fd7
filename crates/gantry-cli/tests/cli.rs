//! End-to-end CLI tests against a scratch project.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Scratch project whose "compiler" is a shell copy.
fn scratch_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    std::fs::create_dir_all(root.join("src/client")).unwrap();
    std::fs::create_dir_all(root.join("src/server")).unwrap();
    std::fs::create_dir_all(root.join("src/assets")).unwrap();
    std::fs::write(root.join("src/client/index.js"), "client code").unwrap();
    std::fs::write(root.join("src/server/index.js"), "server code").unwrap();
    std::fs::write(root.join("src/assets/favicon.ico"), "icon").unwrap();

    std::fs::write(
        root.join("gantry.toml"),
        r#"
[compiler]
command = "sh"
args = ["-c", "cp {entry} {outfile}"]
dev_args = []
"#,
    )
    .unwrap();
    temp
}

fn gantry() -> Command {
    Command::cargo_bin("gantry").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    gantry()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_build_produces_bundles_and_assets() {
    let temp = scratch_project();

    gantry()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(temp.path().join("dist/public/bundle.js")).unwrap(),
        "client code"
    );
    assert_eq!(
        std::fs::read_to_string(temp.path().join("dist/server.js")).unwrap(),
        "server code"
    );
    assert!(temp.path().join("dist/public/favicon.ico").exists());
}

#[test]
fn test_build_fails_without_entry_points() {
    let temp = TempDir::new().unwrap();

    gantry()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_failing_compiler_fails_the_build() {
    let temp = scratch_project();
    std::fs::write(
        temp.path().join("gantry.toml"),
        r#"
[compiler]
command = "sh"
args = ["-c", "echo 'error: broken' >&2; exit 1"]
dev_args = []
"#,
    )
    .unwrap();

    gantry()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to compile"));

    assert!(!temp.path().join("dist/public/bundle.js").exists());
}

#[test]
fn test_build_surfaces_compiler_warnings() {
    let temp = scratch_project();
    std::fs::write(
        temp.path().join("gantry.toml"),
        r#"
[compiler]
command = "sh"
args = ["-c", "echo 'warning: legacy import' >&2; cp {entry} {outfile}"]
dev_args = []
"#,
    )
    .unwrap();

    gantry()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("compiler warning"));
}

#[test]
fn test_clean_removes_destination_root() {
    let temp = scratch_project();

    gantry()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .success();
    assert!(temp.path().join("dist").exists());

    gantry()
        .args(["clean", "--root"])
        .arg(temp.path())
        .assert()
        .success();
    assert!(!temp.path().join("dist").exists());
}

#[test]
fn test_missing_config_file_is_reported() {
    let temp = scratch_project();

    gantry()
        .args(["build", "--config", "nope.toml", "--root"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}
