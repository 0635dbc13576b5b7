use std::sync::Arc;
use std::time::{Duration, Instant};

use apex_core::config::AppConfig;
use apex_core::domain::agent::AgentId;
use apex_core::domain::message::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::{AgentCatalog, AgentProfile};
use crate::conversation::{ConversationStore, InMemoryConversationStore, TurnLocks};
use crate::llm::{
    Completion, CompletionRequest, GeminiClient, LlmClient, LlmError, ToolCall, ToolSpec,
};
use crate::router::IntentRouter;
use crate::tools::ToolRegistry;

const PLACEHOLDER_CONFIDENCE: f64 = 0.85;
const FAILURE_RESPONSE: &str =
    "I encountered an error processing your request. Please try again or contact support.";
const FAILURE_HITL_REASON: &str = "Agent processing error";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    pub organization_id: String,
    pub user_id: String,
    #[serde(default = "default_user_role")]
    pub user_role: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Forces a specific agent; unknown labels resolve to the claims agent.
    #[serde(default)]
    pub agent_type: Option<String>,
}

fn default_user_role() -> String {
    "member".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub model: String,
    pub message_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub response: String,
    pub agent_type: AgentId,
    pub conversation_id: String,
    pub tool_calls: Vec<String>,
    pub confidence_score: Option<f64>,
    pub requires_hitl: bool,
    pub hitl_reason: Option<String>,
    pub processing_time_ms: u64,
    pub metadata: TurnMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Routing,
    BuildingContext,
    InvokingModel,
    ExecutingTools,
    ReInvokingModel,
    Persisting,
    Done,
    Failed,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routing => "routing",
            Self::BuildingContext => "building_context",
            Self::InvokingModel => "invoking_model",
            Self::ExecutingTools => "executing_tools",
            Self::ReInvokingModel => "re_invoking_model",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeSettings {
    pub model: String,
    pub temperature: f32,
    pub history_window: usize,
    pub model_timeout: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            history_window: config.agents.history_window,
            model_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

struct Reply {
    text: String,
    tools_used: Vec<String>,
    confidence: Option<f64>,
}

/// Runs chat turns: route, build context, call the model and its tools, persist.
pub struct AgentRuntime {
    settings: RuntimeSettings,
    catalog: AgentCatalog,
    tools: ToolRegistry,
    router: IntentRouter,
    store: Arc<dyn ConversationStore>,
    locks: TurnLocks,
    llm: Option<Arc<dyn LlmClient>>,
}

impl AgentRuntime {
    /// With `llm = None` routing uses keywords and turns answer with a fallback text.
    pub fn new(
        settings: RuntimeSettings,
        llm: Option<Arc<dyn LlmClient>>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let router = match &llm {
            Some(client) => {
                IntentRouter::model(Arc::clone(client), settings.model.clone(), settings.model_timeout)
            }
            None => IntentRouter::keyword(),
        };

        Self {
            catalog: AgentCatalog::standard(settings.model.clone()),
            tools: ToolRegistry::standard(),
            router,
            store,
            locks: TurnLocks::default(),
            llm,
            settings,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let llm = GeminiClient::from_config(&config.llm)?
            .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
        let store = Arc::new(InMemoryConversationStore::new(config.agents.max_conversations));
        Ok(Self::new(RuntimeSettings::from_config(config), llm, store))
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn model_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub async fn process_message(&self, request: TurnRequest, correlation_id: &str) -> TurnResult {
        let started = Instant::now();

        transition(correlation_id, TurnState::Routing);
        let profile = match request.agent_type.as_deref().filter(|label| !label.trim().is_empty())
        {
            Some(label) => self.catalog.lookup(label),
            None => self.catalog.get(self.router.route(&request.message, correlation_id).await),
        };
        let conversation_id = request
            .conversation_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{}:{}", request.user_id, profile.agent_id));

        info!(
            event_name = "agent.turn.started",
            correlation_id,
            agent_type = profile.agent_id.as_str(),
            organization_id = %request.organization_id,
            user_id = %request.user_id,
            user_role = %request.user_role,
            "processing chat turn"
        );

        let _turn = self.locks.acquire(&conversation_id).await;

        let outcome = self.run_turn(profile, &conversation_id, &request.message, correlation_id).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let metadata = |message_count| TurnMetadata {
            model: profile.model_id.clone(),
            message_count,
        };

        match outcome {
            Ok((reply, message_count)) => {
                transition(correlation_id, TurnState::Done);
                TurnResult {
                    response: reply.text,
                    agent_type: profile.agent_id,
                    conversation_id,
                    tool_calls: reply.tools_used,
                    confidence_score: reply.confidence,
                    requires_hitl: false,
                    hitl_reason: None,
                    processing_time_ms: elapsed_ms,
                    metadata: metadata(message_count),
                    error: None,
                }
            }
            Err(failure) => {
                transition(correlation_id, TurnState::Failed);
                error!(
                    event_name = "agent.turn.failed",
                    correlation_id,
                    agent_type = profile.agent_id.as_str(),
                    error = %failure,
                    "agent processing failed"
                );
                let message_count = self.store.read(&conversation_id).await.map_or(0, |h| h.len());
                TurnResult {
                    response: FAILURE_RESPONSE.to_string(),
                    agent_type: profile.agent_id,
                    conversation_id,
                    tool_calls: Vec::new(),
                    confidence_score: None,
                    requires_hitl: true,
                    hitl_reason: Some(FAILURE_HITL_REASON.to_string()),
                    processing_time_ms: elapsed_ms,
                    metadata: metadata(message_count),
                    error: Some(failure.to_string()),
                }
            }
        }
    }

    /// Returns the reply and the stored history length after persisting.
    async fn run_turn(
        &self,
        profile: &AgentProfile,
        conversation_id: &str,
        message: &str,
        correlation_id: &str,
    ) -> anyhow::Result<(Reply, usize)> {
        transition(correlation_id, TurnState::BuildingContext);
        let mut context = vec![Message::system(profile.system_prompt)];
        context.extend(self.store.recent(conversation_id, self.settings.history_window).await?);
        context.push(Message::user(message));

        transition(correlation_id, TurnState::InvokingModel);
        let reply = match &self.llm {
            None => Reply {
                text: fallback_response(profile.agent_id, message),
                tools_used: Vec::new(),
                confidence: None,
            },
            Some(client) => {
                self.converse(client.as_ref(), profile, context, correlation_id).await?
            }
        };

        transition(correlation_id, TurnState::Persisting);
        self.store
            .append(
                conversation_id,
                vec![Message::user(message), Message::assistant(reply.text.clone())],
            )
            .await?;
        let message_count = self.store.read(conversation_id).await?.len();
        Ok((reply, message_count))
    }

    async fn converse(
        &self,
        client: &dyn LlmClient,
        profile: &AgentProfile,
        mut context: Vec<Message>,
        correlation_id: &str,
    ) -> anyhow::Result<Reply> {
        let tools = profile
            .tool_names
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect::<Vec<_>>();

        let first = self.invoke(client, context.clone(), tools).await?;
        if first.tool_calls.is_empty() {
            return Ok(Reply {
                text: first.content,
                tools_used: Vec::new(),
                confidence: Some(PLACEHOLDER_CONFIDENCE),
            });
        }

        transition(correlation_id, TurnState::ExecutingTools);
        let mut tools_used = Vec::new();
        let mut tool_messages = Vec::new();
        for call in &first.tool_calls {
            let Some(output) = self.execute_tool(profile, call, correlation_id).await? else {
                continue;
            };
            tool_messages.push(Message::user(format!("Tool '{}' returned: {output}", call.name)));
            tools_used.push(call.name.clone());
        }

        if !first.content.is_empty() {
            context.push(Message::assistant(first.content));
        }
        context.extend(tool_messages);

        transition(correlation_id, TurnState::ReInvokingModel);
        let last = self.invoke(client, context, Vec::new()).await?;
        Ok(Reply { text: last.content, tools_used, confidence: Some(PLACEHOLDER_CONFIDENCE) })
    }

    async fn invoke(
        &self,
        client: &dyn LlmClient,
        messages: Vec<Message>,
        tools: Vec<ToolSpec>,
    ) -> Result<Completion, LlmError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages,
            tools,
        };
        tokio::time::timeout(self.settings.model_timeout, client.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.settings.model_timeout.as_secs()))?
    }

    /// Runs `call` when the agent owns the named tool; other names yield `None`.
    async fn execute_tool(
        &self,
        profile: &AgentProfile,
        call: &ToolCall,
        correlation_id: &str,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        let tool = match self.tools.get(&call.name) {
            Some(tool) if profile.allows_tool(&call.name) => tool,
            _ => {
                warn!(
                    event_name = "agent.tool.dropped",
                    correlation_id,
                    agent_type = profile.agent_id.as_str(),
                    tool = %call.name,
                    "model requested a tool outside the agent's tool set"
                );
                return Ok(None);
            }
        };

        let output =
            tokio::time::timeout(self.settings.model_timeout, tool.execute(call.arguments.clone()))
                .await
                .map_err(|_| anyhow::anyhow!("tool `{}` timed out", call.name))??;
        debug!(
            event_name = "agent.tool.executed",
            correlation_id,
            tool = %call.name,
            "tool call executed"
        );
        Ok(Some(output))
    }

    /// Clears stored history for `conversation_id`. Missing ids are not an error.
    pub async fn clear_conversation(&self, conversation_id: &str) -> anyhow::Result<bool> {
        let _turn = self.locks.acquire(conversation_id).await;
        let removed = self.store.clear(conversation_id).await?;
        info!(
            event_name = "agent.conversation.cleared",
            correlation_id = conversation_id,
            removed,
            "conversation cleared"
        );
        Ok(removed)
    }

    pub async fn history(&self, conversation_id: &str) -> anyhow::Result<Vec<Message>> {
        Ok(self.store.read(conversation_id).await?)
    }
}

fn transition(correlation_id: &str, state: TurnState) {
    debug!(event_name = "agent.turn.transition", correlation_id, state = state.as_str());
}

fn fallback_response(agent_id: AgentId, message: &str) -> String {
    format!(
        "[{} Agent] I received your message: '{message}'. AI services are not configured yet \
         (no API key). Once configured, I can help with healthcare queries using specialized tools.",
        agent_id.as_str().to_uppercase()
    )
}
