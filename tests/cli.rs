//! Command-line smoke tests against a throwaway data directory

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn debitmanager(data: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("debitmanager").unwrap();
    cmd.env("DEBITMANAGER_DATA_DIR", data.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Initialize with the share fallback off so nothing is opened on the desktop
fn init(data: &TempDir) {
    debitmanager(data)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));
    std::fs::write(
        data.path().join("config.json"),
        r#"{ "share": { "enabled": false } }"#,
    )
    .unwrap();
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("debitmanager")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("restore"));
}

#[test]
fn ledger_commands_track_balances() {
    let data = TempDir::new().unwrap();
    init(&data);

    debitmanager(&data)
        .args(["debtor", "add", "Ann", "--phone", "555-0100", "--balance", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added debtor Ann (ID 1)"));

    debitmanager(&data)
        .args(["txn", "add", "1", "out", "5.50", "--note", "lunch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("balance now 15.50"));

    debitmanager(&data)
        .args(["txn", "add", "1", "in", "0.50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("balance now 15.00"));

    debitmanager(&data)
        .args(["debtor", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ann"))
        .stdout(predicate::str::contains("15.00"));
}

#[test]
fn invalid_amount_is_reported() {
    let data = TempDir::new().unwrap();
    init(&data);

    debitmanager(&data)
        .args(["debtor", "add", "Ann", "--balance", "ten"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount"));
}

#[test]
fn backup_and_restore_from_file() {
    let data = TempDir::new().unwrap();
    init(&data);

    debitmanager(&data)
        .args(["debtor", "add", "Ann"])
        .assert()
        .success();

    debitmanager(&data)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local only"));

    let snapshot = std::fs::read_dir(data.path().join("backups"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|ext| ext == "db"))
        .unwrap();

    debitmanager(&data)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 1 backup(s)"));

    debitmanager(&data)
        .args(["debtor", "add", "Bob"])
        .assert()
        .success();

    debitmanager(&data)
        .arg("restore")
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));

    debitmanager(&data)
        .arg("restore")
        .arg("--force")
        .arg("--file")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restore complete."));

    debitmanager(&data)
        .args(["debtor", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ann"))
        .stdout(predicate::str::contains("Bob").not());

    debitmanager(&data)
        .args(["backup", "last"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Last backup:"));
}

#[test]
fn logs_show_database_events_and_clear() {
    let data = TempDir::new().unwrap();
    init(&data);

    debitmanager(&data)
        .args(["backup", "create"])
        .assert()
        .success();

    debitmanager(&data)
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("live database handle opened"))
        .stdout(predicate::str::contains("INFO"));

    debitmanager(&data)
        .args(["logs", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared"));

    debitmanager(&data)
        .arg("logs")
        .assert()
        .success()
        .stdout(predicate::str::contains("No database log entries."));
}
