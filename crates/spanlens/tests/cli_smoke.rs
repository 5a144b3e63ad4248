use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/app.py"),
        "class Greeter:\n    def greet(self, name):\n        return name\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("src/util.ts"),
        "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
    )
    .unwrap();
    dir
}

fn spanlens(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("spanlens").expect("binary exists");
    cmd.current_dir(dir.path()).env_remove("SPANLENS_LOG");
    cmd
}

#[test]
fn help_displays_usage() {
    Command::cargo_bin("spanlens")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("detect"));
}

#[test]
fn detect_lists_definitions() {
    let dir = workspace();
    spanlens(&dir)
        .args(["detect", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.py (python)"))
        .stdout(predicate::str::contains("  1-3 class Greeter"))
        .stdout(predicate::str::contains("  2-3 function greet"))
        .stdout(predicate::str::contains("  1-3 function add"));
}

#[test]
fn detect_filters_by_glob() {
    let dir = workspace();
    spanlens(&dir)
        .args(["detect", "src", "--glob", "*.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("util.ts"))
        .stdout(predicate::str::contains("app.py").not());
}

#[test]
fn detect_emits_json() {
    let dir = workspace();
    let output = spanlens(&dir)
        .args(["detect", "src/app.py", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let spans = &reports[0]["spans"];
    assert_eq!(spans[0]["name"], "Greeter");
    assert_eq!(spans[0]["kind"], "class");
    assert_eq!(spans[1]["lineStart"], 2);
    assert_eq!(spans[1]["lineEnd"], 3);
}

#[test]
fn detect_reports_missing_paths() {
    let dir = workspace();
    spanlens(&dir)
        .args(["detect", "missing.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("path not found"));
}

#[test]
fn completions_are_generated() {
    Command::cargo_bin("spanlens")
        .expect("binary exists")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spanlens"));
}

#[test]
fn annotate_without_upload_explains_what_to_do() {
    let dir = workspace();
    spanlens(&dir)
        .args(["annotate", "src/app.py", "--name", "greet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has not been uploaded"));
}
