//! Guardian notification dispatcher.
//!
//! Relays finance events to the platform's notification webhook (which fans
//! out to the guardian mobile app). Strictly best-effort: the financial
//! transaction has already committed by the time this runs, so failures are
//! logged and swallowed, never propagated.

use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        if webhook_url.is_none() {
            debug!("Notification webhook not configured, dispatch disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url,
        }
    }

    pub async fn payment_approved(&self, student_id: Uuid, kind: &str, amount: i64) {
        self.dispatch(
            "payment_approved",
            json!({
                "student_id": student_id,
                "kind": kind,
                "amount": amount,
            }),
        )
        .await;
    }

    pub async fn payment_rejected(&self, student_id: Uuid, reason: &str) {
        self.dispatch(
            "payment_rejected",
            json!({
                "student_id": student_id,
                "reason": reason,
            }),
        )
        .await;
    }

    async fn dispatch(&self, event: &str, data: serde_json::Value) {
        let Some(url) = &self.webhook_url else {
            debug!(event = event, "Skipping notification, webhook not configured");
            return;
        };

        let payload = json!({ "event": event, "data": data });

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    event = event,
                    status = %response.status(),
                    "Notification webhook returned an error"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(event = event, error = %e, "Failed to dispatch notification");
            }
        }
    }
}
