//! JSON API mounted under `/api/v1`.
//!
//! - `/agents`      chat turns, conversation reset, agent listing
//! - `/predictions` fraud, cost, risk, readmission and IBNR heuristics
//! - `/workflows`   single workflow node execution, node type listing
//! - `/documents`   document analysis, CMS-1500 extraction, code suggestions

pub mod agents;
pub mod documents;
pub mod predictions;
pub mod workflows;

use apex_core::config::ServerConfig;
use apex_core::errors::{ApplicationError, InterfaceError};
use axum::{
    http::{HeaderValue, StatusCode},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use crate::bootstrap::AppState;
use crate::health;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/api/v1/agents", agents::router())
        .nest("/api/v1/predictions", predictions::router())
        .nest("/api/v1/workflows", workflows::router())
        .nest("/api/v1/documents", documents::router())
        .with_state(state.clone())
        .merge(health::router(state))
        .layer(cors_layer(&server.cors_allowed_origins))
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "system.cors.invalid_origin",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect::<Vec<_>>();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub(crate) fn correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub(crate) fn error_response(
    error: ApplicationError,
    correlation_id: &str,
) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(correlation_id);
    // Bad requests echo the validation message; other tiers never expose internals.
    let (status, message) = match &interface {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.as_str()),
        InterfaceError::ServiceUnavailable { message, .. } => {
            warn!(
                event_name = "api.request.unavailable",
                correlation_id,
                detail = %message,
                "request failed on an unavailable dependency"
            );
            (StatusCode::SERVICE_UNAVAILABLE, interface.user_message())
        }
    };
    (
        status,
        Json(ApiError {
            error: message.to_string(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}
