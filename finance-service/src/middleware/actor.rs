//! Acting-admin context.
//!
//! The platform gateway authenticates the admin and stamps their identity
//! onto the request; this service only reads the headers back. Every
//! financial mutation records the actor for audit.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_NAME_HEADER: &str = "X-Actor-Name";

/// Identity of the admin performing the request.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub actor_id: String,
    /// Display name used in composed notes; falls back to the id.
    pub actor_name: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing {} header (required from gateway)",
                    ACTOR_ID_HEADER
                ))
            })?;

        let actor_name = parts
            .headers
            .get(ACTOR_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(actor_id);

        Ok(ActorContext {
            actor_id: actor_id.to_string(),
            actor_name: actor_name.to_string(),
        })
    }
}
