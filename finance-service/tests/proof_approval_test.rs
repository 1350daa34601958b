//! Payment proof workflow integration tests: submission rules, approval
//! side effects across all ledgers, rejection semantics.

mod common;

use common::spawn_app;
use serde_json::json;
use uuid::Uuid;

/// A combined transfer settles the referenced bill in full and credits the
/// wallet with exactly the leftover.
#[tokio::test]
async fn approve_combined_proof_settles_bill_and_tops_up_wallet() {
    let app = spawn_app().await;

    let student = app.create_student("Ahmad Fulan").await;
    let bill = app
        .create_bill(student, "SPP Agustus", "2026-08", 550_000, "2026-08-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "combined",
            "bill_ids": [bill],
            "total_amount": 650_000,
            "topup_amount": 100_000,
            "note": "Transfer SPP Agustus, Top-up: Rp100.000",
            "blob_ref": "proofs/2026/08/transfer-abc.jpg",
        }))
        .await;

    app.approve_proof(proof).await;

    // Bill fully settled.
    let bills = app.get_json(&format!("/students/{}/bills", student)).await;
    let bill_row = &bills.as_array().unwrap()[0];
    assert_eq!(bill_row["status"], "paid");
    assert_eq!(bill_row["paid_amount"], 550_000);

    // Wallet credited with exactly the top-up portion.
    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 100_000);
    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["kind"], "credit");
    assert_eq!(transactions[0]["amount"], 100_000);
    assert_eq!(transactions[0]["balance_after"], 100_000);

    // One cash book inflow, linked to a payment record.
    let entries = app.cash_book_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["direction"], "in");
    assert_eq!(entries[0]["category"], "bill_payment");
    assert_eq!(entries[0]["amount"], 550_000);
    assert!(entries[0]["payment_id"].is_string());
    assert!(entries[0]["doc_number"]
        .as_str()
        .unwrap()
        .starts_with("KM-"));

    // Proof reached its terminal state.
    let approved = app.get_json("/proofs?status=approved").await;
    assert_eq!(approved.as_array().unwrap().len(), 1);
    assert_eq!(approved[0]["proof_id"], proof.to_string());
}

/// A proof referencing several bills settles every one of them in full,
/// with one payment record and one cash book entry each, and the amounts
/// agree exactly.
#[tokio::test]
async fn approve_settles_every_referenced_bill_in_full() {
    let app = spawn_app().await;

    let student = app.create_student("Siti Maryam").await;
    let spp = app
        .create_bill(student, "SPP Juli", "2026-07", 550_000, "2026-07-10")
        .await;
    let asrama = app
        .create_bill(student, "Asrama Juli", "2026-07", 250_000, "2026-07-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "bill_payment",
            "bill_ids": [spp, asrama],
            "total_amount": 800_000,
            "blob_ref": "proofs/transfer-double.jpg",
        }))
        .await;

    app.approve_proof(proof).await;

    let bills = app.get_json(&format!("/students/{}/bills", student)).await;
    for bill in bills.as_array().unwrap() {
        assert_eq!(bill["status"], "paid");
        assert_eq!(bill["paid_amount"], bill["nominal"]);
    }

    // No wallet side effect on a pure bill payment.
    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 0);
    assert!(statement["transactions"].as_array().unwrap().is_empty());

    // Cash book entries and payment records reconcile to the rupiah.
    let records = app.get_json(&format!("/proofs/{}/records", proof)).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    let record_sum: i64 = records.iter().map(|r| r["amount"].as_i64().unwrap()).sum();

    let entries = app.cash_book_entries().await;
    assert_eq!(entries.len(), 2);
    let entry_sum: i64 = entries.iter().map(|e| e["amount"].as_i64().unwrap()).sum();

    assert_eq!(record_sum, 800_000);
    assert_eq!(entry_sum, record_sum);

    for record in records {
        assert_eq!(record["remaining_after"], 0);
        let linked = entries
            .iter()
            .find(|e| e["payment_id"] == record["payment_id"])
            .expect("Every payment record has a linked cash book entry");
        assert_eq!(linked["amount"], record["amount"]);
    }
}

/// Approving anything but a pending proof is a conflict and changes
/// nothing.
#[tokio::test]
async fn approve_non_pending_proof_is_a_conflict_without_side_effects() {
    let app = spawn_app().await;

    let student = app.create_student("Umar Said").await;
    let bill = app
        .create_bill(student, "SPP September", "2026-09", 550_000, "2026-09-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "bill_payment",
            "bill_ids": [bill],
            "total_amount": 550_000,
            "blob_ref": "proofs/transfer-1.jpg",
        }))
        .await;

    app.approve_proof(proof).await;

    let second = app
        .post(&format!("/proofs/{}/approve", proof), &json!({}))
        .await;
    assert_eq!(second.status().as_u16(), 409);

    // Still exactly one settlement.
    let entries = app.cash_book_entries().await;
    assert_eq!(entries.len(), 1);
    let records = app.get_json(&format!("/proofs/{}/records", proof)).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
}

/// Rejecting with an empty note is a validation failure; the proof stays
/// pending and no ledger moves.
#[tokio::test]
async fn reject_requires_a_note() {
    let app = spawn_app().await;

    let student = app.create_student("Hasan Basri").await;
    let bill = app
        .create_bill(student, "SPP Oktober", "2026-10", 550_000, "2026-10-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "bill_payment",
            "bill_ids": [bill],
            "total_amount": 550_000,
            "blob_ref": "proofs/transfer-2.jpg",
        }))
        .await;

    let response = app
        .post(&format!("/proofs/{}/reject", proof), &json!({ "note": "" }))
        .await;
    assert_eq!(response.status().as_u16(), 422);

    let pending = app.get_json("/proofs?status=pending").await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let bills = app.get_json(&format!("/students/{}/bills", student)).await;
    assert_eq!(bills[0]["status"], "unpaid");
    assert!(app.cash_book_entries().await.is_empty());
    let statement = app.wallet_statement(student).await;
    assert!(statement["transactions"].as_array().unwrap().is_empty());
}

/// A proper rejection is terminal: stored with its note and immune to a
/// later approval.
#[tokio::test]
async fn reject_is_terminal() {
    let app = spawn_app().await;

    let student = app.create_student("Zainab Putri").await;
    let bill = app
        .create_bill(student, "SPP November", "2026-11", 550_000, "2026-11-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "bill_payment",
            "bill_ids": [bill],
            "total_amount": 550_000,
            "blob_ref": "proofs/transfer-3.jpg",
        }))
        .await;

    let response = app
        .post(
            &format!("/proofs/{}/reject", proof),
            &json!({ "note": "Nominal transfer tidak terbaca" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let rejected = app.get_json("/proofs?status=rejected").await;
    assert_eq!(rejected.as_array().unwrap().len(), 1);
    assert_eq!(rejected[0]["admin_note"], "Nominal transfer tidak terbaca");
    assert_eq!(rejected[0]["processed_by"], common::TEST_ACTOR_ID);

    let approve_after = app
        .post(&format!("/proofs/{}/approve", proof), &json!({}))
        .await;
    assert_eq!(approve_after.status().as_u16(), 409);
}

/// A declared total below the bills' outstanding amount can never be
/// applied.
#[tokio::test]
async fn approve_fails_when_total_does_not_cover_bills() {
    let app = spawn_app().await;

    let student = app.create_student("Abdullah Karim").await;
    let bill = app
        .create_bill(student, "SPP Desember", "2026-12", 550_000, "2026-12-10")
        .await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "combined",
            "bill_ids": [bill],
            "total_amount": 500_000,
            "blob_ref": "proofs/transfer-short.jpg",
        }))
        .await;

    let response = app
        .post(&format!("/proofs/{}/approve", proof), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Nothing moved, the proof is still pending.
    let bills = app.get_json(&format!("/students/{}/bills", student)).await;
    assert_eq!(bills[0]["status"], "unpaid");
    assert!(app.cash_book_entries().await.is_empty());
    let pending = app.get_json("/proofs?status=pending").await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
}

/// Submission enforces the kind/bill-list precondition.
#[tokio::test]
async fn submit_validates_kind_preconditions() {
    let app = spawn_app().await;

    let student = app.create_student("Fatimah Azzahra").await;
    let bill = app
        .create_bill(student, "SPP Januari", "2027-01", 550_000, "2027-01-10")
        .await;

    // A top-up proof must not reference bills.
    let response = app
        .post(
            "/proofs",
            &json!({
                "student_id": student,
                "kind": "wallet_topup",
                "bill_ids": [bill],
                "total_amount": 100_000,
                "blob_ref": "proofs/topup.jpg",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // A bill payment must reference at least one.
    let response = app
        .post(
            "/proofs",
            &json!({
                "student_id": student,
                "kind": "bill_payment",
                "bill_ids": [],
                "total_amount": 100_000,
                "blob_ref": "proofs/billpay.jpg",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Unknown bills are a 404.
    let response = app
        .post(
            "/proofs",
            &json!({
                "student_id": student,
                "kind": "bill_payment",
                "bill_ids": [Uuid::new_v4()],
                "total_amount": 100_000,
                "blob_ref": "proofs/ghost.jpg",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

/// A pure top-up proof creates the wallet on first approval and credits the
/// full amount.
#[tokio::test]
async fn approve_wallet_topup_creates_wallet_and_credits_total() {
    let app = spawn_app().await;

    let student = app.create_student("Ridho Pratama").await;

    let proof = app
        .submit_proof(&json!({
            "student_id": student,
            "kind": "wallet_topup",
            "total_amount": 200_000,
            "blob_ref": "proofs/topup-1.jpg",
        }))
        .await;

    app.approve_proof(proof).await;

    let statement = app.wallet_statement(student).await;
    assert_eq!(statement["balance"], 200_000);
    let transactions = statement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["kind"], "credit");
    assert_eq!(transactions[0]["method"], "transfer");
    assert!(transactions[0]["description"]
        .as_str()
        .unwrap()
        .contains(common::TEST_ACTOR_NAME));

    // No bill portion, so no cash book movement.
    assert!(app.cash_book_entries().await.is_empty());
}
