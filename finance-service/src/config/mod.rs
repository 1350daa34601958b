use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct FinanceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub notification: NotificationConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct NotificationConfig {
    /// Platform webhook that relays events to the guardian app. Absent in
    /// standalone deployments; dispatch is then disabled.
    pub webhook_url: Option<String>,
}

impl FinanceConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("FINANCE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("FINANCE_SERVICE_PORT")
            .unwrap_or_else(|_| "3007".to_string())
            .parse()?;

        let db_url =
            env::var("FINANCE_DATABASE_URL").unwrap_or_else(|_| "sqlite://finance.db".to_string());
        let max_connections = env::var("FINANCE_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?;
        let min_connections = env::var("FINANCE_DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let webhook_url = env::var("FINANCE_NOTIFICATION_WEBHOOK_URL").ok();

        let log_level = env::var("FINANCE_LOG_LEVEL")
            .unwrap_or_else(|_| "info,finance_service=debug".to_string());
        let otlp_endpoint = env::var("FINANCE_OTLP_ENDPOINT").ok();

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            notification: NotificationConfig { webhook_url },
            service_name: "finance-service".to_string(),
            log_level,
            otlp_endpoint,
        })
    }
}
