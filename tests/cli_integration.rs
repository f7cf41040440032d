//! CLI integration tests for swivel.
//!
//! Headers come from `tests/fixtures/include` and their clang AST dumps
//! from `tests/fixtures/dumps`, so clang is not needed.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the swivel binary command.
fn swivel() -> Command {
    let mut cmd = Command::cargo_bin("swivel").unwrap();
    cmd.arg("--no-color");
    cmd
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// `swivel generate` against the fixtures, writing into `out`.
fn generate(tmp: &TempDir) -> Command {
    let mut cmd = swivel();
    cmd.arg("generate")
        .arg("-I")
        .arg(fixtures().join("include"))
        .arg("--dumps")
        .arg(fixtures().join("dumps"))
        .arg("--output-dir")
        .arg(tmp.path().join("out"))
        .current_dir(tmp.path());
    cmd
}

// ============================================================================
// swivel generate
// ============================================================================

#[test]
fn test_generate_writes_interface() {
    let tmp = TempDir::new().unwrap();

    generate(&tmp)
        .assert()
        .success()
        .stderr(predicate::str::contains("Generated"));

    let interface = fs::read_to_string(tmp.path().join("out").join("rizin.i")).unwrap();
    assert!(interface.starts_with("%module(directors=1) rizin\n"));
    assert!(interface.contains("#include <rz_list.h>"));
    assert!(interface.contains("#include <rz_core.h>"));
    assert!(interface.contains("%RzList(RzCoreFile)"));
    assert!(interface.contains("typedef struct rz_core_t RzCore;"));
}

#[test]
fn test_generate_module_flags() {
    let tmp = TempDir::new().unwrap();

    generate(&tmp)
        .args(["--module", "rz", "--no-directors"])
        .assert()
        .success();

    let interface = fs::read_to_string(tmp.path().join("out").join("rz.i")).unwrap();
    assert!(interface.starts_with("%module rz\n"));
    assert!(interface.contains("bool rz_warn_deprecate = true;"));
}

#[test]
fn test_generate_reads_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("swivel.toml"),
        "[module]\nname = \"rizin_core\"\ndirectors = false\n",
    )
    .unwrap();

    generate(&tmp).assert().success();

    let interface = fs::read_to_string(tmp.path().join("out").join("rizin_core.i")).unwrap();
    assert!(interface.starts_with("%module rizin_core\n"));
}

#[test]
fn test_generate_unknown_script() {
    let tmp = TempDir::new().unwrap();

    generate(&tmp)
        .args(["--script", "cutter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown binding script `cutter`"))
        .stderr(predicate::str::contains("available scripts: rizin"))
        .stderr(predicate::str::contains("swivel generate --list"));
}

#[test]
fn test_generate_list_scripts() {
    swivel()
        .args(["generate", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rizin"));
}

#[test]
fn test_generate_missing_header() {
    let tmp = TempDir::new().unwrap();

    swivel()
        .args(["generate", "--dumps"])
        .arg(fixtures().join("dumps"))
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("header `rz_list.h` not found"));
}

#[test]
fn test_generate_missing_dump() {
    let tmp = TempDir::new().unwrap();
    let dumps = tmp.path().join("dumps");
    fs::create_dir_all(&dumps).unwrap();

    swivel()
        .arg("generate")
        .arg("-I")
        .arg(fixtures().join("include"))
        .arg("--dumps")
        .arg(&dumps)
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no AST dump for"));
}

// ============================================================================
// swivel inspect
// ============================================================================

#[test]
fn test_inspect_lists_declarations() {
    swivel()
        .arg("inspect")
        .arg("rz_core.h")
        .arg("-I")
        .arg(fixtures().join("include"))
        .arg("--dumps")
        .arg(fixtures().join("dumps"))
        .args(["--kind", "function", "--prefix", "rz_core_se"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rz_core_seek"))
        .stdout(predicate::str::contains("[RZ_API]"))
        .stdout(predicate::str::contains("rz_core_new").not());
}

#[test]
fn test_inspect_json() {
    let output = swivel()
        .arg("inspect")
        .arg(fixtures().join("include").join("rz_list.h"))
        .arg("--dumps")
        .arg(fixtures().join("dumps"))
        .args(["--kind", "typedef", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let summaries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = summaries
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["RzListIter", "RzList"]);
}

// ============================================================================
// swivel completions
// ============================================================================

#[test]
fn test_completions_bash() {
    swivel()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("swivel"));
}

#[test]
fn test_help() {
    swivel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("inspect"));
}
