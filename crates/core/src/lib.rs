pub mod config;
pub mod documents;
pub mod domain;
pub mod errors;
pub mod predictions;
pub mod workflows;

pub use documents::{DocumentAnalysisResult, DocumentSchema, UploadedDocument, DOCUMENT_SCHEMAS};
pub use domain::agent::AgentId;
pub use domain::message::{Message, Role};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use predictions::{
    analyze_fraud, estimate_ibnr, predict_cost, predict_readmission, score_member_risk,
};
pub use workflows::{
    NodeExecutionStatus, NodeRegistry, WorkflowNodeExecutionRequest, WorkflowNodeExecutionResult,
};
