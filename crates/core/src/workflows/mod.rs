pub mod engine;
pub mod nodes;

pub use engine::{
    NodeExecutionStatus, NodeRegistry, WorkflowNodeExecutionRequest, WorkflowNodeExecutionResult,
};
pub use nodes::{NodeHandler, NodeTypeDescriptor};
