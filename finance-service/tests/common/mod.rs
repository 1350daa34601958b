//! Common test utilities for finance-service integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use finance_service::config::{DatabaseConfig, FinanceConfig, NotificationConfig, ServerConfig};
use finance_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Once;
use uuid::Uuid;

pub const TEST_ACTOR_ID: &str = "admin-001";
pub const TEST_ACTOR_NAME: &str = "Ustadz Fauzan";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,finance_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Test application wrapper driving the HTTP surface.
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// Spawn a test application backed by an in-memory database.
pub async fn spawn_app() -> TestApp {
    init_tracing();

    let config = FinanceConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: Secret::new("sqlite::memory:".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        notification: NotificationConfig { webhook_url: None },
        service_name: "finance-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let test_app = TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    };

    // Wait for the server to accept requests.
    for _ in 0..20 {
        if test_app
            .client
            .get(format!("{}/health", test_app.address))
            .send()
            .await
            .is_ok()
        {
            return test_app;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
    panic!("Server did not become ready");
}

impl TestApp {
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("X-Actor-Id", TEST_ACTOR_ID)
            .header("X-Actor-Name", TEST_ACTOR_NAME)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.address, path))
            .header("X-Actor-Id", TEST_ACTOR_ID)
            .header("X-Actor-Name", TEST_ACTOR_NAME)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self
            .client
            .get(format!("{}{}", self.address, path))
            .header("X-Actor-Id", TEST_ACTOR_ID)
            .header("X-Actor-Name", TEST_ACTOR_NAME)
            .send()
            .await
            .expect("Failed to execute request");
        assert!(
            response.status().is_success(),
            "GET {} failed: {}",
            path,
            response.status()
        );
        response.json().await.expect("Invalid JSON response")
    }

    /// Create a student and return its id.
    pub async fn create_student(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/students",
                &json!({ "name": name, "class_name": "2 Aliyah" }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.expect("Invalid student JSON");
        body["student_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("Missing student_id")
    }

    /// Create a bill and return its id.
    pub async fn create_bill(
        &self,
        student_id: Uuid,
        title: &str,
        period: &str,
        nominal: i64,
        due_date: &str,
    ) -> Uuid {
        let response = self
            .post(
                "/bills",
                &json!({
                    "student_id": student_id,
                    "title": title,
                    "period": period,
                    "nominal": nominal,
                    "due_date": due_date,
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.expect("Invalid bill JSON");
        body["bill_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("Missing bill_id")
    }

    /// Submit a proof and return its id.
    pub async fn submit_proof(&self, body: &Value) -> Uuid {
        let response = self.post("/proofs", body).await;
        assert_eq!(response.status().as_u16(), 201, "submit_proof failed");
        let body: Value = response.json().await.expect("Invalid proof JSON");
        body["proof_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("Missing proof_id")
    }

    /// Approve a proof, asserting success.
    pub async fn approve_proof(&self, proof_id: Uuid) {
        let response = self
            .post(&format!("/proofs/{}/approve", proof_id), &json!({}))
            .await;
        assert_eq!(response.status().as_u16(), 200, "approve_proof failed");
    }

    /// Wallet statement for a student.
    pub async fn wallet_statement(&self, student_id: Uuid) -> Value {
        self.get_json(&format!("/students/{}/wallet", student_id))
            .await
    }

    /// Manual top-up, returning the created transaction.
    pub async fn topup(&self, student_id: Uuid, amount: i64) -> Value {
        let response = self
            .post(
                "/wallets/topup",
                &json!({
                    "student_id": student_id,
                    "amount": amount,
                    "method": "cash",
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "topup failed");
        response.json().await.expect("Invalid transaction JSON")
    }

    /// Manual charge (purchase debit), returning the created transaction.
    pub async fn charge(&self, student_id: Uuid, amount: i64) -> Value {
        let response = self
            .post(
                "/wallets/charge",
                &json!({
                    "student_id": student_id,
                    "amount": amount,
                    "method": "cash",
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201, "charge failed");
        response.json().await.expect("Invalid transaction JSON")
    }

    /// Create a pool and return its id.
    pub async fn create_pool(&self, name: &str) -> Uuid {
        let response = self.post("/pools", &json!({ "name": name })).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.expect("Invalid pool JSON");
        body["pool_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("Missing pool_id")
    }

    /// Entries of the default cash book.
    pub async fn cash_book_entries(&self) -> Vec<Value> {
        self.get_json("/cash-books/KAS/entries")
            .await
            .as_array()
            .cloned()
            .expect("Expected entry array")
    }
}

/// Signed wallet-balance delta of a statement row, skipping voided rows.
pub fn statement_delta(tx: &Value) -> i64 {
    if tx["voided"].as_bool().unwrap_or(false) {
        return 0;
    }
    let amount = tx["amount"].as_i64().expect("Missing amount");
    match tx["kind"].as_str().expect("Missing kind") {
        "credit" | "epos_in" => amount,
        _ => -amount,
    }
}
