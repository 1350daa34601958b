//! Withdrawal workflow integration tests.

mod common;

use common::{spawn_app, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

async fn fund_pool(app: &TestApp, pool: Uuid, amount: i64) {
    let student = app.create_student("Penyetor Kantin").await;
    app.topup(student, amount).await;
    let response = app
        .post(
            "/wallets/pos",
            &json!({
                "student_id": student,
                "pool_id": pool,
                "direction": "spend",
                "amount": amount,
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
}

async fn create_withdrawal(app: &TestApp, pool: Option<Uuid>, amount: i64) -> String {
    let response = app
        .post(
            "/withdrawals",
            &json!({ "amount": amount, "pool_id": pool, "note": "Setoran ke rekening yayasan" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "pending");
    body["withdrawal_id"].as_str().unwrap().to_string()
}

/// Full pool-based lifecycle: approval records the method without moving
/// money; completion drains the pool and writes the cash book outflow.
#[tokio::test]
async fn pool_withdrawal_lifecycle_moves_money_only_at_completion() {
    let app = spawn_app().await;
    let pool = app.create_pool("Kantin Putri").await;
    fund_pool(&app, pool, 60_000).await;

    let withdrawal = create_withdrawal(&app, Some(pool), 50_000).await;

    let response = app
        .post(
            &format!("/withdrawals/{}/approve", withdrawal),
            &json!({ "method": "bank_transfer" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let approved: Value = response.json().await.unwrap();
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["method"], "bank_transfer");
    assert_eq!(approved["processed_by"], common::TEST_ACTOR_ID);

    // Approval alone moved nothing.
    let pool_state = app.get_json(&format!("/pools/{}", pool)).await;
    assert_eq!(pool_state["balance"], 60_000);

    let response = app
        .post(
            &format!("/withdrawals/{}/complete", withdrawal),
            &json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let completed: Value = response.json().await.unwrap();
    assert_eq!(completed["status"], "completed");

    let pool_state = app.get_json(&format!("/pools/{}", pool)).await;
    assert_eq!(pool_state["balance"], 10_000);

    let entries = app.cash_book_entries().await;
    let outflows: Vec<&Value> = entries
        .iter()
        .filter(|e| e["direction"] == "out")
        .collect();
    assert_eq!(outflows.len(), 1);
    assert_eq!(outflows[0]["category"], "withdrawal");
    assert_eq!(outflows[0]["amount"], 50_000);
}

/// Rejection needs a reason and is terminal.
#[tokio::test]
async fn reject_requires_reason_and_is_terminal() {
    let app = spawn_app().await;
    let withdrawal = create_withdrawal(&app, None, 30_000).await;

    let response = app
        .post(
            &format!("/withdrawals/{}/reject", withdrawal),
            &json!({ "reason": "" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);

    let response = app
        .post(
            &format!("/withdrawals/{}/reject", withdrawal),
            &json!({ "reason": "Saldo kas belum mencukupi" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let rejected: Value = response.json().await.unwrap();
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["reject_reason"], "Saldo kas belum mencukupi");

    // Terminal: neither approval nor a second rejection is possible.
    let response = app
        .post(
            &format!("/withdrawals/{}/approve", withdrawal),
            &json!({ "method": "cash" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

/// Completion is only reachable from approved.
#[tokio::test]
async fn complete_requires_prior_approval() {
    let app = spawn_app().await;
    let withdrawal = create_withdrawal(&app, None, 30_000).await;

    let response = app
        .post(
            &format!("/withdrawals/{}/complete", withdrawal),
            &json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

/// A pool can never be drained below zero; the withdrawal survives the
/// failed attempt.
#[tokio::test]
async fn completion_refuses_to_overdraw_the_pool() {
    let app = spawn_app().await;
    let pool = app.create_pool("Koperasi").await;
    fund_pool(&app, pool, 20_000).await;

    let withdrawal = create_withdrawal(&app, Some(pool), 50_000).await;
    let response = app
        .post(
            &format!("/withdrawals/{}/approve", withdrawal),
            &json!({ "method": "cash" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post(
            &format!("/withdrawals/{}/complete", withdrawal),
            &json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    // Nothing moved: pool untouched, withdrawal still approved, no outflow.
    let pool_state = app.get_json(&format!("/pools/{}", pool)).await;
    assert_eq!(pool_state["balance"], 20_000);

    let listed = app.get_json("/withdrawals?status=approved").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let entries = app.cash_book_entries().await;
    assert!(entries.iter().all(|e| e["direction"] != "out"));
}

/// Cash withdrawals have no pool and still produce the cash book outflow.
#[tokio::test]
async fn cash_withdrawal_completes_without_a_pool() {
    let app = spawn_app().await;
    let withdrawal = create_withdrawal(&app, None, 75_000).await;

    let response = app
        .post(
            &format!("/withdrawals/{}/approve", withdrawal),
            &json!({ "method": "cash" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post(
            &format!("/withdrawals/{}/complete", withdrawal),
            &json!({}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let entries = app.cash_book_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["direction"], "out");
    assert_eq!(entries[0]["amount"], 75_000);
}
