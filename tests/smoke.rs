//! Smoke tests -- verify the binary runs and its subcommands are wired up.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    Command::cargo_bin("wifi-bench")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("USB Wi-Fi adapter throughput benchmark"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("wifi-bench")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("wifi-bench"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("wifi-bench")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--iterations"));
}

#[test]
fn test_devices_subcommand_exists() {
    Command::cargo_bin("wifi-bench")
        .unwrap()
        .args(["devices", "--help"])
        .assert()
        .success();
}

#[test]
fn test_report_rejects_non_session_directory() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("wifi-bench")
        .unwrap()
        .env_remove("WIFI_BENCH_CONFIG")
        .current_dir(dir.path())
        .arg("report")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a session directory"));
}

#[test]
fn test_unloadable_settings_file_is_warned_about() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("bench.toml");
    std::fs::write(&settings, "[run]\niterations = \"many\"\n").unwrap();

    Command::cargo_bin("wifi-bench")
        .unwrap()
        .env("WIFI_BENCH_CONFIG", &settings)
        .env_remove("RUST_LOG")
        .current_dir(dir.path())
        .arg("report")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("could not be loaded"))
        .stderr(predicates::str::contains("bench.toml"));
}

#[test]
fn test_config_flag_overrides_environment() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.toml");
    let bad = dir.path().join("bad.toml");
    std::fs::write(&good, "[logging]\nlevel = \"warn\"\n").unwrap();
    std::fs::write(&bad, "[run]\niterations = \"many\"\n").unwrap();

    Command::cargo_bin("wifi-bench")
        .unwrap()
        .env("WIFI_BENCH_CONFIG", &bad)
        .env_remove("RUST_LOG")
        .current_dir(dir.path())
        .arg("--config")
        .arg(&good)
        .arg("report")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("could not be loaded").not());
}
