use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn posvault(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("posvault").unwrap();
    cmd.env("POSVAULT_DATA_DIR", dir.path())
        .env("POSVAULT_LOG", "off");
    cmd
}

fn seed_sales(dir: &TempDir, value: &str) {
    posvault(dir)
        .args(["store", "put", "sales", value])
        .assert()
        .success();
}

#[test]
fn test_no_command_prints_usage_hint() {
    let dir = TempDir::new().unwrap();
    posvault(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("posvault --help"));
}

#[test]
fn test_create_and_list_backup() {
    let dir = TempDir::new().unwrap();
    seed_sales(&dir, r#"[{"id":1,"total":1999}]"#);

    posvault(&dir)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created"));

    posvault(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manual"))
        .stdout(predicate::str::contains("1 succeeded, 0 failed"));
}

#[test]
fn test_restore_latest_brings_back_values() {
    let dir = TempDir::new().unwrap();
    seed_sales(&dir, r#"[{"id":1,"total":1999}]"#);
    posvault(&dir).args(["backup", "create"]).assert().success();

    seed_sales(&dir, "[]");

    // Without --force nothing changes
    posvault(&dir)
        .args(["backup", "restore", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
    posvault(&dir)
        .args(["store", "get", "sales"])
        .assert()
        .stdout(predicate::str::contains("[]"));

    posvault(&dir)
        .args(["backup", "restore", "latest", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore complete"));

    posvault(&dir)
        .args(["store", "get", "sales"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"[{"id":1,"total":1999}]"#));
}

#[test]
fn test_export_then_import() {
    let dir = TempDir::new().unwrap();
    seed_sales(&dir, r#"[{"id":7}]"#);
    posvault(&dir).args(["backup", "create"]).assert().success();

    let exported = dir.path().join("copy.json");
    posvault(&dir)
        .args(["backup", "export", "latest", "--output"])
        .arg(&exported)
        .assert()
        .success();
    assert!(fs::read_to_string(&exported)
        .unwrap()
        .contains("\"schemaVersion\""));

    let other = TempDir::new().unwrap();
    posvault(&other)
        .args(["backup", "import"])
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported backup"));
    posvault(&other)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("imported"));
}

#[test]
fn test_import_without_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"createdAt":"2025-06-30T12:00:00Z","domains":{"sales":[]}}"#).unwrap();

    posvault(&dir)
        .args(["backup", "import"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid backup format"));

    posvault(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));
}

#[test]
fn test_remove_unknown_backup_is_noop() {
    let dir = TempDir::new().unwrap();
    posvault(&dir)
        .args(["backup", "remove", "12345"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to remove"));
}

#[test]
fn test_config_set_and_show() {
    let dir = TempDir::new().unwrap();
    posvault(&dir)
        .args([
            "config",
            "set",
            "--cadence",
            "hourly",
            "--retention-days",
            "7",
            "--encode",
            "true",
        ])
        .assert()
        .success();

    posvault(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cadence:        hourly"))
        .stdout(predicate::str::contains("Retention:      7 day(s)"))
        .stdout(predicate::str::contains("Encode payload: true"));
}

#[test]
fn test_config_rejects_bad_time() {
    let dir = TempDir::new().unwrap();
    posvault(&dir)
        .args(["config", "set", "--time", "25:99"])
        .assert()
        .failure();
}

#[test]
fn test_size_limit_failure_is_listed() {
    let dir = TempDir::new().unwrap();
    posvault(&dir)
        .args(["config", "set", "--max-size-kb", "1"])
        .assert()
        .success();
    seed_sales(&dir, &format!("[\"{}\"]", "x".repeat(2048)));

    posvault(&dir)
        .args(["backup", "create"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Snapshot too large"));

    posvault(&dir)
        .args(["backup", "list", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("0 succeeded, 1 failed"));
}

#[test]
fn test_run_once_takes_owed_backup() {
    let dir = TempDir::new().unwrap();
    seed_sales(&dir, r#"[{"id":3}]"#);
    posvault(&dir)
        .args(["config", "set", "--cadence", "hourly"])
        .assert()
        .success();

    posvault(&dir)
        .args(["run", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Automatic backups attempted: 1"));

    // Within the same hour nothing more is owed
    posvault(&dir)
        .args(["run", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Automatic backups attempted: 0"));

    posvault(&dir)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("automatic"))
        .stdout(predicate::str::contains("Total: 1 backup(s)"));
}

#[test]
fn test_store_capacity_warning() {
    let dir = TempDir::new().unwrap();
    // Value plus its captured copy alone exceed the 1 KiB capacity
    seed_sales(&dir, &format!("[\"{}\"]", "x".repeat(1500)));

    posvault(&dir)
        .env("POSVAULT_LOG", "warn")
        .env("POSVAULT_STORE_CAPACITY_KB", "1")
        .args(["backup", "create"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Storage is"));

    posvault(&dir)
        .env("POSVAULT_LOG", "warn")
        .args(["backup", "create"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Storage is").not());
}
