use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

mod common;

const ALICE: &str = "11111111-1111-4111-8111-111111111111";
const BOB: &str = "22222222-2222-4222-8222-222222222222";
const ORDER_1: &str = "aaaaaaaa-0000-4000-8000-000000000001";
const ORDER_2: &str = "aaaaaaaa-0000-4000-8000-000000000002";
const ORDER_3: &str = "aaaaaaaa-0000-4000-8000-000000000003";

#[test]
fn test_cli_reserve_complete_cancel() {
    let dir = tempdir().unwrap();
    let balances = dir.path().join("balances.csv");
    let events = dir.path().join("events.csv");
    common::write_csv(
        &balances,
        "customer, available",
        &[format!("{ALICE}, 100.0"), format!("{BOB}, 40")],
    )
    .unwrap();
    common::write_csv(
        &events,
        "type, customer, order, amount",
        &[
            format!("reserve, {ALICE}, {ORDER_1}, 20.0"),
            format!("complete, {ALICE}, {ORDER_1},"),
            format!("reserve, {ALICE}, {ORDER_2}, 30"),
            format!("cancel, {ALICE}, {ORDER_2},"),
            format!("reserve, {BOB}, {ORDER_3}, 15.5"),
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("payment-participant"));
    cmd.arg(&events).arg("--balances").arg(&balances);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("customer,available,reserved"))
        .stdout(predicate::str::contains(format!("{ALICE},80,0")))
        .stdout(predicate::str::contains(format!("{BOB},24.5,15.5")));
}

#[test]
fn test_cli_reports_rejected_events() {
    let dir = tempdir().unwrap();
    let balances = dir.path().join("balances.csv");
    let events = dir.path().join("events.csv");
    common::write_csv(&balances, "customer, available", &[format!("{BOB}, 40")]).unwrap();
    common::write_csv(
        &events,
        "type, customer, order, amount",
        &[
            format!("reserve, {BOB}, {ORDER_1}, 50"),
            format!("reserve, {BOB}, {ORDER_2}, 20"),
            format!("complete, {BOB}, {ORDER_2},"),
            format!("cancel, {BOB}, {ORDER_2},"),
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("payment-participant"));
    cmd.arg(&events).arg("--balances").arg(&balances);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Insufficient funds"))
        .stderr(predicate::str::contains("Error processing event"))
        .stderr(predicate::str::contains("is completed and cannot be canceled"))
        .stdout(predicate::str::contains(format!("{BOB},20,0")));
}

#[test]
fn test_cli_resolves_to_latest_payment_for_order() {
    let dir = tempdir().unwrap();
    let balances = dir.path().join("balances.csv");
    let events = dir.path().join("events.csv");
    common::write_csv(&balances, "customer, available", &[format!("{ALICE}, 100")]).unwrap();
    common::write_csv(
        &events,
        "type, customer, order, amount",
        &[
            format!("reserve, {ALICE}, {ORDER_1}, 10"),
            format!("complete, {ALICE}, {ORDER_1},"),
            format!("reserve, {ALICE}, {ORDER_1}, 25"),
            format!("cancel, {ALICE}, {ORDER_1},"),
            format!("complete, {ALICE}, {ORDER_1},"),
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("payment-participant"));
    cmd.arg(&events).arg("--balances").arg(&balances);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("is canceled and cannot be completed"))
        .stderr(predicate::str::contains("is already completed").not())
        .stdout(predicate::str::contains(format!("{ALICE},90,0")));
}

#[test]
fn test_cli_skips_malformed_rows() {
    let dir = tempdir().unwrap();
    let balances = dir.path().join("balances.csv");
    let events = dir.path().join("events.csv");
    common::write_csv(&balances, "customer, available", &[format!("{ALICE}, 10")]).unwrap();
    common::write_csv(
        &events,
        "type, customer, order, amount",
        &[
            format!("refund, {ALICE}, {ORDER_1}, 1.0"),
            format!("reserve, not-a-customer, {ORDER_1}, 1.0"),
            format!("reserve, {ALICE}, {ORDER_1},"),
            format!("cancel, {ALICE}, {ORDER_3},"),
            format!("reserve, {ALICE}, {ORDER_2}, 2.5"),
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("payment-participant"));
    cmd.arg(&events).arg("--balances").arg(&balances);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading event"))
        .stderr(predicate::str::contains("has no amount"))
        .stderr(predicate::str::contains("no payment for order"))
        .stdout(predicate::str::contains(format!("{ALICE},7.5,2.5")));
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!("payment-participant"));
    cmd.arg("does/not/exist.csv");
    cmd.assert().failure();
}
