//! Transfer-out billing reconciliation integration tests.

mod common;

use chrono::{Duration, Utc};
use common::spawn_app;
use serde_json::{json, Value};

/// Future bills are soft-deleted unless already overdue with money
/// outstanding; bills up to the effective month are untouched.
#[tokio::test]
async fn transfer_out_reconciles_future_bills() {
    let app = spawn_app().await;
    let student = app.create_student("Ahmad Fulan").await;

    let today = Utc::now().date_naive();
    let yesterday = (today - Duration::days(1)).to_string();
    let next_month = (today + Duration::days(30)).to_string();

    // Bill within the effective month: untouched by the rule.
    let current = app
        .create_bill(student, "SPP Juli", "2026-07", 550_000, "2026-07-10")
        .await;
    // Future bill, not yet due: removed.
    let future_open = app
        .create_bill(student, "SPP Oktober", "2026-10", 550_000, &next_month)
        .await;
    // Future bill, already overdue and unpaid: kept as tunggakan.
    let future_overdue = app
        .create_bill(student, "SPP September", "2026-09", 550_000, &yesterday)
        .await;
    // Future bill, overdue but already settled: removed.
    let future_paid = app
        .create_bill(student, "Asrama September", "2026-09", 250_000, &yesterday)
        .await;
    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "bill_payment",
            "bill_ids": [future_paid],
            "total_amount": 250_000,
            "blob_ref": "proofs/asrama.jpg",
        }))
        .await;
    app.approve_proof(proof).await;

    let response = app
        .post(
            &format!("/students/{}/transfer-out", student),
            &json!({ "effective_month": "2026-08" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["bills_removed"], 2);
    assert_eq!(summary["bills_kept_outstanding"], 1);

    let student_row = app.get_json(&format!("/students/{}", student)).await;
    assert_eq!(student_row["status"], "transferred_out");
    assert_eq!(student_row["transfer_out_month"], "2026-08");

    let bills = app.get_json(&format!("/students/{}/bills", student)).await;
    let deleted_of = |id: &uuid::Uuid| {
        bills
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["bill_id"] == id.to_string())
            .map(|b| !b["deleted_utc"].is_null())
            .unwrap()
    };

    assert!(!deleted_of(&current), "bills up to the cutoff stay");
    assert!(deleted_of(&future_open), "future open bill is removed");
    assert!(
        !deleted_of(&future_overdue),
        "overdue unpaid bill stays as tunggakan"
    );
    assert!(deleted_of(&future_paid), "settled future bill is removed");
}

/// Transfer-out is one-shot per student.
#[tokio::test]
async fn transfer_out_twice_is_a_conflict() {
    let app = spawn_app().await;
    let student = app.create_student("Siti Maryam").await;

    let response = app
        .post(
            &format!("/students/{}/transfer-out", student),
            &json!({ "effective_month": "2026-08" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .post(
            &format!("/students/{}/transfer-out", student),
            &json!({ "effective_month": "2026-09" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

/// The effective month has to parse; junk is rejected before any mutation.
#[tokio::test]
async fn transfer_out_validates_the_month() {
    let app = spawn_app().await;
    let student = app.create_student("Umar Said").await;

    let response = app
        .post(
            &format!("/students/{}/transfer-out", student),
            &json!({ "effective_month": "2026-13" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let student_row = app.get_json(&format!("/students/{}", student)).await;
    assert_eq!(student_row["status"], "active");
}
