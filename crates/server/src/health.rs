use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

const SERVICE_NAME: &str = "Apex Health AI Services";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub llm: HealthCheck,
    pub checked_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/", get(service_info)).route("/health", get(health)).with_state(state)
}

pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// The service stays healthy without a model credential; turns then answer
/// with the fallback text and routing uses keywords.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let runtime = &state.runtime;
    let llm = if runtime.model_configured() {
        HealthCheck {
            status: "ready",
            detail: format!("model `{}` configured", runtime.settings().model),
        }
    } else {
        HealthCheck {
            status: "fallback",
            detail: "no model credential; keyword routing and fallback responses".to_string(),
        }
    };

    Json(HealthResponse {
        status: "healthy",
        service: HealthCheck {
            status: "ready",
            detail: format!(
                "{} agents, {} workflow node types",
                runtime.catalog().profiles().count(),
                state.nodes.len()
            ),
        },
        llm,
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, Json};

    use crate::api::test_support::keyword_state;
    use crate::health::{health, service_info};

    #[tokio::test]
    async fn health_is_healthy_without_model_credential() {
        let Json(payload) = health(State(keyword_state())).await;

        assert_eq!(payload.status, "healthy");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.service.detail, "5 agents, 8 workflow node types");
        assert_eq!(payload.llm.status, "fallback");
    }

    #[tokio::test]
    async fn service_info_reports_version() {
        let Json(info) = service_info().await;

        assert_eq!(info.service, "Apex Health AI Services");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }
}
