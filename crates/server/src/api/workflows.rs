use apex_core::workflows::{
    NodeExecutionStatus, NodeTypeDescriptor, WorkflowNodeExecutionRequest,
    WorkflowNodeExecutionResult,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct NodeTypeListing {
    pub node_types: Vec<NodeTypeDescriptor>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/execute-node", post(execute_node)).route("/node-types", get(node_types))
}

pub async fn execute_node(
    State(state): State<AppState>,
    Json(request): Json<WorkflowNodeExecutionRequest>,
) -> Json<WorkflowNodeExecutionResult> {
    let result = state.nodes.execute(&request);
    match result.status {
        NodeExecutionStatus::Failed => warn!(
            event_name = "api.workflows.node_failed",
            correlation_id = %request.execution_id,
            node_id = %request.node_id,
            node_type = %request.node_type,
            "workflow node execution failed"
        ),
        status => info!(
            event_name = "api.workflows.node_executed",
            correlation_id = %request.execution_id,
            node_id = %request.node_id,
            node_type = %request.node_type,
            requires_hitl = status == NodeExecutionStatus::WaitingHitl,
            "workflow node executed"
        ),
    }
    Json(result)
}

pub async fn node_types(State(state): State<AppState>) -> Json<NodeTypeListing> {
    Json(NodeTypeListing { node_types: state.nodes.descriptors() })
}
