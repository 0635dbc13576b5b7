use apex_agent::{AgentProfile, TurnRequest, TurnResult};
use apex_core::errors::ApplicationError;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::{correlation_id, error_response, ApiResult};
use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AgentListing {
    pub agents: Vec<AgentProfile>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/conversations/{conversation_id}", delete(clear_conversation))
        .route("/agents", get(list_agents))
}

/// Chat turns always answer 200; failures are reported inside the result.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Json<TurnResult> {
    let correlation_id = correlation_id();
    let result = state.runtime.process_message(request, &correlation_id).await;
    info!(
        event_name = "api.agents.chat_completed",
        correlation_id = %correlation_id,
        agent_type = result.agent_type.as_str(),
        requires_hitl = result.requires_hitl,
        processing_time_ms = result.processing_time_ms,
        "chat turn completed"
    );
    Json(result)
}

pub async fn clear_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ApiResult<ClearResponse> {
    state.runtime.clear_conversation(&conversation_id).await.map_err(|error| {
        error_response(ApplicationError::ConversationStore(error.to_string()), &correlation_id())
    })?;

    Ok(Json(ClearResponse { success: true, message: "Conversation cleared".to_string() }))
}

pub async fn list_agents(State(state): State<AppState>) -> Json<AgentListing> {
    Json(AgentListing { agents: state.runtime.catalog().profiles().cloned().collect() })
}

#[cfg(test)]
mod tests {
    use apex_agent::TurnRequest;
    use axum::{
        body::Body,
        extract::{Path, State},
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::{chat, clear_conversation, list_agents};
    use crate::api::test_support::{json_body, keyword_state, test_app};

    fn request(message: &str) -> TurnRequest {
        TurnRequest {
            message: message.to_string(),
            organization_id: "org-1".to_string(),
            user_id: "user-1".to_string(),
            user_role: "member".to_string(),
            conversation_id: None,
            agent_type: None,
        }
    }

    #[tokio::test]
    async fn chat_routes_claim_questions_to_claims_agent() {
        let state = keyword_state();

        let Json(result) =
            chat(State(state), Json(request("What's the status of claim CLM-2024-000001?"))).await;

        assert_eq!(result.agent_type.as_str(), "claims");
        assert!(result.response.contains("CLM-2024-000001"));
        assert!(result.tool_calls.is_empty());
        assert!(!result.requires_hitl);
    }

    #[tokio::test]
    async fn clearing_twice_succeeds() {
        let state = keyword_state();
        let _ = chat(State(state.clone()), Json(request("hello"))).await;

        let key = || Path("user-1:member_service".to_string());

        let Json(first) =
            clear_conversation(State(state.clone()), key()).await.expect("clear");
        let Json(second) =
            clear_conversation(State(state.clone()), key()).await.expect("clear again");

        assert!(first.success && second.success);
        assert_eq!(second.message, "Conversation cleared");
        assert!(state.runtime.history("user-1:member_service").await.expect("history").is_empty());
    }

    #[tokio::test]
    async fn agent_listing_has_five_agents_with_tools() {
        let Json(listing) = list_agents(State(keyword_state())).await;

        assert_eq!(listing.agents.len(), 5);
        let encoded = serde_json::to_value(&listing).expect("serialize");
        assert_eq!(encoded["agents"][0]["type"], "claims");
        assert_eq!(encoded["agents"][4]["tools"], json!([]));
    }

    #[tokio::test]
    async fn chat_over_http_returns_turn_result() {
        let body = json!({
            "message": "Is a pre-cert needed for an MRI?",
            "organization_id": "org-1",
            "user_id": "user-9",
        });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/agents/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["agent_type"], "prior_auth");
        assert_eq!(payload["conversation_id"], "user-9:prior_auth");
        assert!(payload.get("error").is_none());
    }

    #[tokio::test]
    async fn chat_without_message_is_rejected() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/agents/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"sessionId": "test"}).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
