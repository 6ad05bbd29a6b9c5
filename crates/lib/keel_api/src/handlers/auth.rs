//! Token exchange endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, Rejection};
use crate::middleware::auth::AuthGate;
use crate::middleware::correlation::MaybeCorrelationId;
use crate::response::ApiResponse;

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
}

/// `POST` handler: exchange a refresh token for a new access token.
///
/// Rejected refresh tokens answer 401 with the same message as any other
/// token failure.
pub async fn refresh_handler(
    State(gate): State<AuthGate>,
    MaybeCorrelationId(correlation): MaybeCorrelationId,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<ApiResponse<AccessTokenResponse>, Rejection> {
    let Json(body) = body.map_err(|e| {
        AppError::BadRequest(format!("Invalid request body: {}", e.body_text()))
            .tagged(correlation.as_ref())
    })?;

    let access_token = gate
        .tokens()
        .refresh(&body.refresh_token)
        .map_err(|e| AppError::from(e).tagged(correlation.as_ref()))?;

    info!("access token refreshed");
    Ok(ApiResponse::ok(AccessTokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: gate.tokens().access_ttl(),
    })
    .with_correlation_id(correlation.map(|c| c.as_str().to_string())))
}
