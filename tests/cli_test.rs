//! CLI Integration Tests
//!
//! These tests run the `odin` binary as a subprocess with a cleared
//! environment and check that missing configuration stops it.

use std::process::{Command, Output};
use tempfile::TempDir;

fn odin(args: &[&str], env: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_odin"))
        .env_clear()
        .envs(env.iter().copied())
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    let output = odin(&["--help"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["mimic", "partition", "build", "run"] {
        assert!(stdout.contains(subcommand), "missing {}", subcommand);
    }
}

#[test]
fn test_run_without_configuration_fails() {
    let output = odin(&["run"], &[]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("--dataset"), "{}", err);
    assert!(err.contains("--output"), "{}", err);
}

#[test]
fn test_missing_duration_is_not_defaulted() {
    let tmp = TempDir::new().unwrap();
    let output_dir = tmp.path().to_str().unwrap();
    let output = odin(
        &[
            "build",
            "--dataset",
            "TWIG",
            "--seed",
            "1",
            "--population",
            "10",
            "--output",
            output_dir,
            "--inserts-per-stream",
            "2",
        ],
        &[],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--duration"));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_run_requires_evaluation_labels() {
    let tmp = TempDir::new().unwrap();
    let output_dir = tmp.path().to_str().unwrap();
    let output = odin(
        &["run"],
        &[
            ("generator_dataset", "TWIG"),
            ("generator_seed", "1"),
            ("generator_population", "10"),
            ("generator_mimicking-output", output_dir),
            ("generator_insert-queries-count", "2"),
            ("generator_benchmark_duration", "100"),
        ],
    );
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("evaluation_task-delay"), "{}", err);
    // Nothing was generated before the failure
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}
