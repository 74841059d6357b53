use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

fn write_rows(path: &Path, rows: &[&[&str]]) {
    let mut wtr = csv::Writer::from_path(path).unwrap();
    for row in rows {
        wtr.write_record(*row).unwrap();
    }
    wtr.flush().unwrap();
}

fn seed(dir: &Path) -> PathBuf {
    let path = dir.join("accounts.csv");
    write_rows(
        &path,
        &[
            &["number", "owner", "phone", "currency", "balance", "default", "reserve"],
            &["1000000000000001", "alice", "+37491000001", "AMD", "100", "true", "false"],
            &["1000000000000002", "bob", "+37491000002", "AMD", "0", "true", "false"],
        ],
    );
    path
}

#[test]
fn test_malformed_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = seed(dir.path());
    let transfers = dir.path().join("transfers.csv");
    write_rows(
        &transfers,
        &[
            &["from", "from_type", "to", "to_type", "amount", "currency", "description"],
            // Valid
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "10", "AMD", "a"],
            // Unknown endpoint kind
            &["1000000000000001", "IBAN", "1000000000000002", "ACCOUNT", "10", "AMD", "b"],
            // Missing amount
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "", "AMD", "c"],
            // Negative amount
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "-5", "AMD", "d"],
            // Valid again
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "15", "AMD", "e"],
        ],
    );

    let mut cmd = Command::new(cargo_bin!("ledger-lending"));
    cmd.arg(&accounts).arg(&transfers);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading transfer"))
        .stdout(predicate::str::contains("1000000000000001,alice,AMD,75"))
        .stdout(predicate::str::contains("1000000000000002,bob,AMD,25"));
}

#[test]
fn test_unknown_currency_and_text_amount() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = seed(dir.path());
    let transfers = dir.path().join("transfers.csv");
    write_rows(
        &transfers,
        &[
            &["from", "from_type", "to", "to_type", "amount", "currency", "description"],
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "ten", "AMD", ""],
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "10", "XYZ", ""],
            &["1000000000000001", "ACCOUNT", "1000000000000002", "ACCOUNT", "5", "AMD", ""],
        ],
    );

    let mut cmd = Command::new(cargo_bin!("ledger-lending"));
    cmd.arg(&accounts).arg(&transfers);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading transfer"))
        .stdout(predicate::str::contains("1000000000000001,alice,AMD,95"))
        .stdout(predicate::str::contains("1000000000000002,bob,AMD,5"));
}

#[test]
fn test_malformed_seed_fails() {
    let dir = tempfile::tempdir().unwrap();
    let accounts = dir.path().join("accounts.csv");
    write_rows(
        &accounts,
        &[
            &["number", "owner", "phone", "currency", "balance", "default", "reserve"],
            &["42", "alice", "", "AMD", "100", "true", "false"],
        ],
    );
    let transfers = dir.path().join("transfers.csv");
    write_rows(
        &transfers,
        &[&["from", "from_type", "to", "to_type", "amount", "currency", "description"]],
    );

    let mut cmd = Command::new(cargo_bin!("ledger-lending"));
    cmd.arg(&accounts).arg(&transfers);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("16 digits"));
}
