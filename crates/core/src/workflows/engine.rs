use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::DomainError;
use crate::workflows::nodes::{
    ClinicalReasonerNode, DocumentExtractionNode, EligibilityCheckNode, FraudDetectorNode,
    GeminiAnalyzerNode, LlmDecisionNode, MedicalCodingNode, NodeHandler, NodeTypeDescriptor,
    SentimentAnalysisNode,
};

const REVIEW_FLAGS: [&str; 2] = ["requires_md_review", "requires_coder_review"];
const REVIEW_REASON: &str = "AI confidence below threshold or review required";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNodeExecutionRequest {
    pub execution_id: String,
    pub node_id: String,
    pub node_type: String,
    #[serde(default = "empty_object")]
    pub node_config: Value,
    #[serde(default = "empty_object")]
    pub input_data: Value,
    pub organization_id: String,
    pub user_id: String,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    Completed,
    Failed,
    WaitingHitl,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNodeExecutionResult {
    pub node_id: String,
    pub status: NodeExecutionStatus,
    pub output_data: Value,
    pub ai_metrics: Option<Value>,
    pub next_nodes: Vec<String>,
    pub requires_hitl: bool,
    pub hitl_reason: Option<String>,
    pub processing_time_ms: u64,
}

/// Immutable table of node handlers, built once at startup.
#[derive(Clone)]
pub struct NodeRegistry {
    model: String,
    handlers: BTreeMap<&'static str, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    pub fn empty(model: impl Into<String>) -> Self {
        Self { model: model.into(), handlers: BTreeMap::new() }
    }

    pub fn standard(model: impl Into<String>) -> Self {
        let model = model.into();
        let mut registry = Self::empty(model.clone());
        registry.register(LlmDecisionNode);
        registry.register(DocumentExtractionNode);
        registry.register(MedicalCodingNode);
        registry.register(FraudDetectorNode);
        registry.register(ClinicalReasonerNode);
        registry.register(SentimentAnalysisNode);
        registry.register(EligibilityCheckNode);
        registry.register(GeminiAnalyzerNode { model });
        registry
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: NodeHandler + 'static,
    {
        self.handlers.insert(handler.node_type(), Arc::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn descriptors(&self) -> Vec<NodeTypeDescriptor> {
        self.handlers.values().map(|handler| handler.descriptor()).collect()
    }

    pub fn handler(&self, node_type: &str) -> Result<&Arc<dyn NodeHandler>, DomainError> {
        self.handlers
            .get(node_type)
            .ok_or_else(|| DomainError::UnknownNodeType(node_type.to_string()))
    }

    /// Runs a single node. Unknown node types produce a `failed` result rather
    /// than an error so the calling workflow engine can record the outcome.
    pub fn execute(&self, request: &WorkflowNodeExecutionRequest) -> WorkflowNodeExecutionResult {
        let started = Instant::now();

        let Ok(handler) = self.handler(&request.node_type) else {
            return WorkflowNodeExecutionResult {
                node_id: request.node_id.clone(),
                status: NodeExecutionStatus::Failed,
                output_data: json!({ "error": format!("Unknown node type: {}", request.node_type) }),
                ai_metrics: None,
                next_nodes: Vec::new(),
                requires_hitl: false,
                hitl_reason: None,
                processing_time_ms: 0,
            };
        };

        let output = handler.execute(&request.node_config, &request.input_data);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let requires_hitl = REVIEW_FLAGS
            .iter()
            .any(|flag| output.get(*flag).and_then(Value::as_bool).unwrap_or(false));
        let confidence = output.get("confidence").cloned().unwrap_or(json!(0));

        WorkflowNodeExecutionResult {
            node_id: request.node_id.clone(),
            status: if requires_hitl {
                NodeExecutionStatus::WaitingHitl
            } else {
                NodeExecutionStatus::Completed
            },
            output_data: output,
            ai_metrics: Some(json!({
                "model": self.model,
                "confidence": confidence,
                "processing_time_ms": elapsed_ms,
            })),
            next_nodes: Vec::new(),
            requires_hitl,
            hitl_reason: requires_hitl.then(|| REVIEW_REASON.to_string()),
            processing_time_ms: elapsed_ms,
        }
    }
}
