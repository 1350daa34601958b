//! Application startup and lifecycle management.

use crate::config::FinanceConfig;
use crate::handlers;
use crate::services::{init_metrics, Database, Notifier};
use axum::{
    routing::{get, patch, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Code of the cash book bill settlements and withdrawals post to.
const DEFAULT_BOOK_CODE: &str = "KAS";
const DEFAULT_BOOK_NAME: &str = "Kas Umum";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub notifier: Notifier,
    pub default_book_id: Uuid,
    pub config: FinanceConfig,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: FinanceConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        let default_book = db
            .get_or_create_cash_book(DEFAULT_BOOK_CODE, DEFAULT_BOOK_NAME)
            .await?;

        let notifier = Notifier::new(config.notification.webhook_url.clone());

        let state = AppState {
            db,
            notifier,
            default_book_id: default_book.book_id,
            config: config.clone(),
        };

        // Port 0 = random port for testing.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Finance service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Students & bills
        .route("/students", post(handlers::students::create_student))
        .route("/students/:id", get(handlers::students::get_student))
        .route(
            "/students/:id/transfer-out",
            post(handlers::students::transfer_out),
        )
        .route("/bills", post(handlers::bills::create_bill))
        .route(
            "/students/:id/bills",
            get(handlers::bills::list_student_bills),
        )
        // Payment proofs
        .route(
            "/proofs",
            post(handlers::proofs::submit_proof).get(handlers::proofs::list_proofs),
        )
        .route(
            "/proofs/:id/records",
            get(handlers::proofs::list_proof_records),
        )
        .route("/proofs/:id/approve", post(handlers::proofs::approve_proof))
        .route("/proofs/:id/reject", post(handlers::proofs::reject_proof))
        // Wallet
        .route(
            "/students/:id/wallet",
            get(handlers::wallets::get_statement),
        )
        .route("/wallets/topup", post(handlers::wallets::topup))
        .route("/wallets/charge", post(handlers::wallets::charge))
        .route("/wallets/pos", post(handlers::wallets::pos_transaction))
        .route(
            "/wallet-transactions/:id",
            patch(handlers::wallets::edit_transaction),
        )
        .route(
            "/wallet-transactions/:id/void",
            post(handlers::wallets::void_transaction),
        )
        // Pools & withdrawals
        .route("/pools", post(handlers::withdrawals::create_pool))
        .route("/pools/:id", get(handlers::withdrawals::get_pool))
        .route(
            "/withdrawals",
            post(handlers::withdrawals::create_withdrawal)
                .get(handlers::withdrawals::list_withdrawals),
        )
        .route(
            "/withdrawals/:id/approve",
            post(handlers::withdrawals::approve_withdrawal),
        )
        .route(
            "/withdrawals/:id/reject",
            post(handlers::withdrawals::reject_withdrawal),
        )
        .route(
            "/withdrawals/:id/complete",
            post(handlers::withdrawals::complete_withdrawal),
        )
        // Cash book
        .route(
            "/cash-books/:code/entries",
            get(handlers::bills::list_cash_book_entries),
        )
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}
