//! Wallet ledger integration tests: balance arithmetic, history snapshots,
//! void and edit semantics, device pool mirroring.

mod common;

use common::{spawn_app, statement_delta};
use serde_json::json;

/// Credits and debits move the live balance and snapshot it per row.
#[tokio::test]
async fn topup_and_charge_update_balance_and_history() {
    let app = spawn_app().await;
    let student = app.create_student("Ahmad Fulan").await;

    app.topup(student, 50_000).await;
    let charge = app.charge(student, 20_000).await;
    assert_eq!(charge["balance_after"], 30_000);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 30_000);

    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["kind"], "credit");
    assert_eq!(transactions[0]["balance_after"], 50_000);
    assert_eq!(transactions[1]["kind"], "debit");
    assert_eq!(transactions[1]["balance_after"], 30_000);
}

/// Spending past the balance is refused atomically.
#[tokio::test]
async fn charge_fails_on_insufficient_balance() {
    let app = spawn_app().await;
    let student = app.create_student("Siti Maryam").await;

    app.topup(student, 10_000).await;

    let response = app
        .post(
            "/wallets/charge",
            &json!({
                "student_id": student,
                "amount": 25_000,
                "method": "cash",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 10_000);
    assert_eq!(statement["transactions"].as_array().unwrap().len(), 1);
}

/// Voiding a debit restores its amount and flags the row without deleting
/// it.
#[tokio::test]
async fn void_restores_balance_and_flags_the_row() {
    let app = spawn_app().await;
    let student = app.create_student("Umar Said").await;

    app.topup(student, 50_000).await;
    let charge = app.charge(student, 20_000).await;
    let charge_id = charge["transaction_id"].as_str().unwrap();

    let response = app
        .post(
            &format!("/wallet-transactions/{}/void", charge_id),
            &json!({ "reason": "Salah input kasir" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 50_000);

    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2, "voided row is kept");
    let voided = transactions
        .iter()
        .find(|t| t["transaction_id"] == *charge_id)
        .unwrap();
    assert_eq!(voided["voided"], true);
    assert_eq!(voided["void_reason"], "Salah input kasir");
    assert_eq!(voided["amount"], 20_000, "monetary fields untouched");

    // Voiding twice is a conflict.
    let again = app
        .post(
            &format!("/wallet-transactions/{}/void", charge_id),
            &json!({ "reason": "double void" }),
        )
        .await;
    assert_eq!(again.status().as_u16(), 409);
}

/// An edit voids the original and appends a replacement row referencing it;
/// the original's values survive for audit.
#[tokio::test]
async fn edit_voids_original_and_appends_replacement() {
    let app = spawn_app().await;
    let student = app.create_student("Hasan Basri").await;

    app.topup(student, 50_000).await;
    let charge = app.charge(student, 20_000).await;
    let charge_id = charge["transaction_id"].as_str().unwrap();

    let response = app
        .patch(
            &format!("/wallet-transactions/{}", charge_id),
            &json!({ "amount": 5_000, "description": "Jajan kantin (koreksi)" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let replacement: serde_json::Value = response.json().await.unwrap();
    assert_eq!(replacement["kind"], "debit");
    assert_eq!(replacement["amount"], 5_000);
    assert_eq!(replacement["replaces_transaction_id"], *charge_id);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 45_000);

    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 3);

    let original = transactions
        .iter()
        .find(|t| t["transaction_id"] == *charge_id)
        .unwrap();
    assert_eq!(original["voided"], true);
    assert_eq!(original["void_reason"], "edited");
    assert_eq!(original["amount"], 20_000, "original amount preserved");

    // Editing the already-voided original again is a conflict.
    let again = app
        .patch(
            &format!("/wallet-transactions/{}", charge_id),
            &json!({ "amount": 1_000 }),
        )
        .await;
    assert_eq!(again.status().as_u16(), 409);
}

/// The wallet invariant: live balance equals the sum of non-voided deltas,
/// across a mix of credits, debits, voids and edits.
#[tokio::test]
async fn balance_equals_sum_of_non_voided_deltas() {
    let app = spawn_app().await;
    let student = app.create_student("Zainab Putri").await;

    app.topup(student, 100_000).await;
    let charge_a = app.charge(student, 30_000).await;
    app.topup(student, 15_000).await;
    let charge_b = app.charge(student, 10_000).await;

    // Void one charge, edit the other.
    let void_id = charge_a["transaction_id"].as_str().unwrap();
    let response = app
        .post(
            &format!("/wallet-transactions/{}/void", void_id),
            &json!({ "reason": "dibatalkan" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let edit_id = charge_b["transaction_id"].as_str().unwrap();
    let response = app
        .patch(
            &format!("/wallet-transactions/{}", edit_id),
            &json!({ "amount": 12_500 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let statement = app.wallet_statement(student).await;
    let balance = statement["balance"].as_i64().unwrap();
    let ledger_sum: i64 = statement["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(statement_delta)
        .sum();

    assert_eq!(balance, ledger_sum);
    assert_eq!(balance, 100_000 - 0 + 15_000 - 12_500);
}

/// Device spending moves the same amount from the wallet into the pool,
/// refunds move it back.
#[tokio::test]
async fn pos_transactions_mirror_the_pool() {
    let app = spawn_app().await;
    let student = app.create_student("Abdullah Karim").await;
    let pool = app.create_pool("Kantin Putra").await;

    app.topup(student, 50_000).await;

    let response = app
        .post(
            "/wallets/pos",
            &json!({
                "student_id": student,
                "pool_id": pool,
                "direction": "spend",
                "amount": 15_000,
                "description": "Nasi goreng",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 35_000);
    let pool_state = app.get_json(&format!("/pools/{}", pool)).await;
    assert_eq!(pool_state["balance"], 15_000);

    let response = app
        .post(
            "/wallets/pos",
            &json!({
                "student_id": student,
                "pool_id": pool,
                "direction": "refund",
                "amount": 5_000,
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 40_000);
    let pool_state = app.get_json(&format!("/pools/{}", pool)).await;
    assert_eq!(pool_state["balance"], 10_000);
}
