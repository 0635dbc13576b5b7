//! Agent orchestration for the Apex Health gateway.
//!
//! A chat turn is routed to one of five specialised agents, answered by the
//! configured model with that agent's tool subset, and appended to the
//! conversation history:
//!
//! 1. **Routing** (`router`) - keyword match, or a zero-temperature model call
//! 2. **Profile** (`catalog`) - system prompt and allowed tools per agent
//! 3. **Model + tools** (`llm`, `tools`) - one tool round, then a final answer
//! 4. **History** (`conversation`) - bounded in-memory store, one turn per key at a time
//!
//! `AgentRuntime` in `runtime` ties these together. Turn failures never escape
//! as errors; they come back as a `TurnResult` flagged for human review.

pub mod catalog;
pub mod conversation;
pub mod llm;
pub mod router;
pub mod runtime;
pub mod tools;

pub use catalog::{AgentCatalog, AgentProfile};
pub use conversation::{ConversationStore, InMemoryConversationStore, StoreError, TurnLocks};
pub use llm::{Completion, CompletionRequest, GeminiClient, LlmClient, LlmError, ToolCall, ToolSpec};
pub use router::{route_by_keywords, IntentRouter};
pub use runtime::{AgentRuntime, RuntimeSettings, TurnRequest, TurnResult, TurnState};
pub use tools::{Tool, ToolRegistry};
