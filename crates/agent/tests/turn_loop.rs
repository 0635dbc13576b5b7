use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apex_agent::{
    AgentRuntime, Completion, CompletionRequest, ConversationStore, InMemoryConversationStore,
    LlmClient, LlmError, RuntimeSettings, ToolCall, TurnRequest,
};
use apex_core::domain::agent::AgentId;
use apex_core::domain::message::{Message, Role};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

/// Replies from a fixed script and records every request it receives.
#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Completion, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<Completion, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::default() })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().expect("requests").push(request);
        self.replies
            .lock()
            .expect("replies")
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::text("script exhausted")))
    }
}

/// Echoes the last user message after a short pause. Records how many stored
/// messages each request carried and the peak number of overlapping calls.
#[derive(Default)]
struct SlowEcho {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    prior_counts: Mutex<Vec<usize>>,
}

#[async_trait]
impl LlmClient for SlowEcho {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        // system prompt and the new user message surround the stored history
        self.prior_counts.lock().expect("counts").push(request.messages.len() - 2);

        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let last = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        Ok(Completion::text(format!("echo: {last}")))
    }
}

/// Blocks each call until the test releases it.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl LlmClient for Gate {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Completion::text("released"))
    }
}

struct Stalled;

#[async_trait]
impl LlmClient for Stalled {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Completion::text("too late"))
    }
}

fn settings() -> RuntimeSettings {
    RuntimeSettings {
        model: "gemini-2.0-flash".to_string(),
        temperature: 0.3,
        history_window: 20,
        model_timeout: Duration::from_millis(200),
    }
}

fn runtime_with(
    llm: Option<Arc<dyn LlmClient>>,
) -> (AgentRuntime, Arc<InMemoryConversationStore>) {
    let store = Arc::new(InMemoryConversationStore::new(100));
    let runtime = AgentRuntime::new(settings(), llm, store.clone());
    (runtime, store)
}

fn turn(message: &str) -> TurnRequest {
    TurnRequest {
        message: message.to_string(),
        organization_id: "org-1".to_string(),
        user_id: "user-1".to_string(),
        user_role: "member".to_string(),
        conversation_id: None,
        agent_type: None,
    }
}

fn forced(message: &str, agent: &str) -> TurnRequest {
    TurnRequest { agent_type: Some(agent.to_string()), ..turn(message) }
}

fn tool_call(name: &str, arguments: serde_json::Value) -> Completion {
    Completion {
        content: String::new(),
        tool_calls: vec![ToolCall { name: name.to_string(), arguments }],
    }
}

#[tokio::test]
async fn claim_status_without_model_gets_fallback_from_claims_agent() {
    let (runtime, store) = runtime_with(None);
    let message = "What's the status of claim CLM-2024-000001?";

    let result = runtime.process_message(turn(message), "req-1").await;

    assert_eq!(result.agent_type, AgentId::Claims);
    assert_eq!(result.conversation_id, "user-1:claims");
    assert!(result.response.contains(message));
    assert!(result.response.starts_with("[CLAIMS Agent]"));
    assert!(result.tool_calls.is_empty());
    assert!(!result.requires_hitl);
    assert_eq!(result.confidence_score, None);
    assert_eq!(result.metadata.message_count, 2);
    assert_eq!(store.read("user-1:claims").await.expect("read").len(), 2);
}

#[tokio::test]
async fn context_carries_only_the_last_twenty_messages() {
    let client = ScriptedClient::new(vec![Ok(Completion::text("noted"))]);
    let (runtime, store) = runtime_with(Some(client.clone()));
    let earlier = (0..25).map(|index| Message::user(format!("m{index}"))).collect();
    store.append("conv-1", earlier).await.expect("seed");

    let request = TurnRequest { conversation_id: Some("conv-1".to_string()), ..forced("next", "coding") };
    let result = runtime.process_message(request, "req-2").await;

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 22);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content, "m5");
    assert_eq!(messages[20].content, "m24");
    assert_eq!(messages[21].content, "next");
    assert_eq!(result.metadata.message_count, 27);
}

#[tokio::test]
async fn tools_outside_the_agent_set_are_dropped() {
    let client = ScriptedClient::new(vec![
        Ok(tool_call("search_providers", json!({"specialty": "cardiology"}))),
        Ok(Completion::text("I can only help with claims here.")),
    ]);
    let (runtime, _store) = runtime_with(Some(client.clone()));

    let result = runtime.process_message(forced("find a cardiologist", "claims"), "req-3").await;

    assert!(result.tool_calls.is_empty());
    assert_eq!(result.response, "I can only help with claims here.");
    assert!(!result.requires_hitl);
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].messages.iter().all(|message| !message.content.starts_with("Tool '")));
}

#[tokio::test]
async fn allowed_tool_output_is_fed_back_to_the_model() {
    let client = ScriptedClient::new(vec![
        Ok(tool_call("lookup_claim_status", json!({"claim_number": "CLM-9"}))),
        Ok(Completion::text("Claim CLM-9 is in review.")),
    ]);
    let (runtime, store) = runtime_with(Some(client.clone()));

    let result = runtime.process_message(forced("status of CLM-9", "claims"), "req-4").await;

    assert_eq!(result.tool_calls, vec!["lookup_claim_status".to_string()]);
    assert_eq!(result.response, "Claim CLM-9 is in review.");
    assert_eq!(result.confidence_score, Some(0.85));

    let requests = client.requests();
    assert_eq!(requests[0].tools.len(), 5);
    assert!(requests[1].tools.is_empty());
    let tool_message = requests[1].messages.last().expect("tool message");
    assert_eq!(tool_message.role, Role::User);
    assert!(tool_message.content.starts_with("Tool 'lookup_claim_status' returned:"));
    assert!(tool_message.content.contains("CLM-9"));

    let history = store.read("user-1:claims").await.expect("read");
    assert_eq!(history, vec![
        Message::user("status of CLM-9"),
        Message::assistant("Claim CLM-9 is in review."),
    ]);
}

#[tokio::test]
async fn model_failure_returns_apology_and_persists_nothing() {
    let client = ScriptedClient::new(vec![Err(LlmError::Api {
        status: 500,
        body: "internal".to_string(),
    })]);
    let (runtime, store) = runtime_with(Some(client));

    let result = runtime.process_message(forced("hello", "compliance"), "req-5").await;

    assert!(result.requires_hitl);
    assert_eq!(result.hitl_reason.as_deref(), Some("Agent processing error"));
    assert!(result.response.starts_with("I encountered an error processing your request."));
    assert!(result.error.as_deref().is_some_and(|error| error.contains("500")));
    assert!(store.read("user-1:compliance").await.expect("read").is_empty());
}

#[tokio::test]
async fn model_timeout_takes_the_failure_path() {
    let (runtime, store) = runtime_with(Some(Arc::new(Stalled)));

    let result = runtime.process_message(forced("hello", "coding"), "req-6").await;

    assert!(result.requires_hitl);
    assert!(result.error.as_deref().is_some_and(|error| error.contains("timed out")));
    assert_eq!(store.len().await.expect("len"), 0);
}

#[tokio::test]
async fn model_routing_picks_the_labelled_agent() {
    let client = ScriptedClient::new(vec![
        Ok(Completion::text("coding")),
        Ok(Completion::text("Use M54.5.")),
    ]);
    let (runtime, _store) = runtime_with(Some(client.clone()));

    let result = runtime.process_message(turn("what code for back pain?"), "req-7").await;

    assert_eq!(result.agent_type, AgentId::Coding);
    assert_eq!(result.conversation_id, "user-1:coding");
    assert_eq!(client.requests()[0].temperature, 0.0);
}

#[tokio::test]
async fn unknown_forced_agent_uses_claims_profile() {
    let (runtime, _store) = runtime_with(None);

    let result = runtime.process_message(forced("hello", "billing"), "req-8").await;

    assert_eq!(result.agent_type, AgentId::Claims);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_on_one_conversation_run_one_at_a_time() {
    let store = Arc::new(InMemoryConversationStore::new(100));
    let client = Arc::new(SlowEcho::default());
    let settings = RuntimeSettings { history_window: 64, ..settings() };
    let runtime = Arc::new(AgentRuntime::new(settings, Some(client.clone()), store.clone()));
    let turns = 16;

    let tasks = (0..turns)
        .map(|index| {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                let request = TurnRequest {
                    conversation_id: Some("shared".to_string()),
                    ..forced(&format!("turn {index}"), "member_service")
                };
                runtime.process_message(request, &format!("req-{index}")).await
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        assert!(!task.await.expect("task").requires_hitl);
    }

    assert_eq!(client.peak_in_flight.load(Ordering::SeqCst), 1);
    let prior_counts = client.prior_counts.lock().expect("counts").clone();
    assert_eq!(prior_counts, (0..turns).map(|turn| 2 * turn).collect::<Vec<_>>());

    let history = store.read("shared").await.expect("read");
    assert_eq!(history.len(), 2 * turns);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn turns_on_different_conversations_overlap() {
    let store = Arc::new(InMemoryConversationStore::new(100));
    let client = Arc::new(SlowEcho::default());
    let runtime = Arc::new(AgentRuntime::new(settings(), Some(client.clone()), store));

    let tasks = (0..8)
        .map(|index| {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move {
                let request = TurnRequest {
                    conversation_id: Some(format!("conv-{index}")),
                    ..forced("hello", "member_service")
                };
                runtime.process_message(request, &format!("req-{index}")).await
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        task.await.expect("task");
    }

    assert!(client.peak_in_flight.load(Ordering::SeqCst) > 1);
    assert!(client.prior_counts.lock().expect("counts").iter().all(|count| *count == 0));
}

#[tokio::test]
async fn clear_waits_for_the_turn_in_flight() {
    let gate = Arc::new(Gate::default());
    let settings = RuntimeSettings { model_timeout: Duration::from_secs(5), ..settings() };
    let store = Arc::new(InMemoryConversationStore::new(100));
    let runtime = Arc::new(AgentRuntime::new(settings, Some(gate.clone()), store));

    let turn_task = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            let request =
                TurnRequest { conversation_id: Some("gated".to_string()), ..forced("hi", "coding") };
            runtime.process_message(request, "req-turn").await
        })
    };
    gate.entered.notified().await;

    let clear_task = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.clear_conversation("gated").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!clear_task.is_finished(), "clear must wait for the turn holding the key");

    gate.release.notify_one();
    assert_eq!(turn_task.await.expect("turn").response, "released");
    assert!(clear_task.await.expect("clear task").expect("clear"));
    assert!(runtime.history("gated").await.expect("history").is_empty());
}

#[tokio::test]
async fn clearing_a_missing_conversation_is_harmless() {
    let (runtime, store) = runtime_with(None);
    runtime.process_message(turn("find a dermatologist"), "req-9").await;

    assert!(!runtime.clear_conversation("nobody:claims").await.expect("clear"));
    assert!(!runtime.clear_conversation("nobody:claims").await.expect("clear again"));
    assert_eq!(store.read("user-1:member_service").await.expect("read").len(), 2);

    assert!(runtime.clear_conversation("user-1:member_service").await.expect("clear"));
    assert!(runtime.history("user-1:member_service").await.expect("history").is_empty());
}
