use std::sync::Arc;
use std::time::Duration;

use apex_core::domain::agent::AgentId;
use apex_core::domain::message::Message;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError};

const ROUTER_PROMPT: &str = "You are the Apex Health AI intent router. Analyze the user's message
and determine which specialized agent should handle it.

Available agents:
- claims: Claims status, adjudication, payment questions
- member_service: Member eligibility, benefits, finding care, cost estimates
- prior_auth: Prior authorization submissions, status, appeals
- coding: ICD-10, CPT/HCPCS coding questions, code lookups
- compliance: HIPAA, CMS regulations, audit, policy questions

Respond with ONLY the agent name (e.g., \"claims\" or \"member_service\").
If unclear, default to \"member_service\".
";

/// Keyword groups in priority order. The first group with a hit wins.
const KEYWORD_GROUPS: [(AgentId, &[&str]); 4] = [
    (AgentId::Claims, &["claim", "adjudic", "payment", "remit", "eob"]),
    (AgentId::PriorAuth, &["prior auth", "authorization", "pre-cert"]),
    (AgentId::Coding, &["icd", "cpt", "hcpcs", "diagnosis code", "procedure code", "coding"]),
    (AgentId::Compliance, &["hipaa", "compliance", "regulation", "audit", "cms rule"]),
];

pub fn route_by_keywords(message: &str) -> AgentId {
    let lowered = message.to_lowercase();
    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(agent_id, _)| *agent_id)
        .unwrap_or(AgentId::MemberService)
}

#[derive(Clone)]
enum Strategy {
    Keyword,
    Model { client: Arc<dyn LlmClient>, model: String, timeout: Duration },
}

/// Classifies a message into one of the five agents. Never fails.
#[derive(Clone)]
pub struct IntentRouter {
    strategy: Strategy,
}

impl IntentRouter {
    pub fn keyword() -> Self {
        Self { strategy: Strategy::Keyword }
    }

    pub fn model(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self { strategy: Strategy::Model { client, model: model.into(), timeout } }
    }

    pub fn mode(&self) -> &'static str {
        match self.strategy {
            Strategy::Keyword => "keyword",
            Strategy::Model { .. } => "model",
        }
    }

    pub async fn route(&self, message: &str, correlation_id: &str) -> AgentId {
        let agent_id = match &self.strategy {
            Strategy::Keyword => route_by_keywords(message),
            Strategy::Model { client, model, timeout } => {
                match classify(client.as_ref(), model, *timeout, message).await {
                    Ok(agent_id) => agent_id,
                    Err(reason) => {
                        warn!(
                            event_name = "agent.router.fallback",
                            correlation_id,
                            reason = %reason,
                            "intent routing failed, defaulting to member_service"
                        );
                        AgentId::MemberService
                    }
                }
            }
        };

        debug!(
            event_name = "agent.router.routed",
            correlation_id,
            mode = self.mode(),
            agent_type = agent_id.as_str(),
            "message routed"
        );
        agent_id
    }
}

async fn classify(
    client: &dyn LlmClient,
    model: &str,
    timeout: Duration,
    message: &str,
) -> Result<AgentId, LlmError> {
    let request = CompletionRequest {
        model: model.to_string(),
        temperature: 0.0,
        messages: vec![Message::system(ROUTER_PROMPT), Message::user(message)],
        tools: Vec::new(),
    };
    let completion = tokio::time::timeout(timeout, client.complete(request))
        .await
        .map_err(|_| LlmError::Timeout(timeout.as_secs()))??;

    completion
        .content
        .trim()
        .to_lowercase()
        .parse::<AgentId>()
        .map_err(|error| LlmError::Parse(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use apex_core::domain::agent::AgentId;
    use async_trait::async_trait;

    use super::{route_by_keywords, IntentRouter};
    use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};

    struct Reply(Result<&'static str, u16>);

    #[async_trait]
    impl LlmClient for Reply {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
            assert_eq!(request.temperature, 0.0);
            assert!(request.tools.is_empty());
            match self.0 {
                Ok(text) => Ok(Completion::text(text)),
                Err(status) => Err(LlmError::Api { status, body: "unavailable".to_string() }),
            }
        }
    }

    struct Stalled;

    #[async_trait]
    impl LlmClient for Stalled {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Completion::text("claims"))
        }
    }

    fn model_router(client: impl LlmClient + 'static) -> IntentRouter {
        IntentRouter::model(Arc::new(client), "gemini-2.0-flash", Duration::from_millis(50))
    }

    #[test]
    fn claims_keywords_route_to_claims() {
        for message in [
            "What's the status of claim CLM-2024-000001?",
            "When will the PAYMENT post?",
            "I need a copy of my EOB",
            "remittance advice is missing",
        ] {
            assert_eq!(route_by_keywords(message), AgentId::Claims, "{message}");
        }
    }

    #[test]
    fn earlier_groups_win_ties() {
        assert_eq!(route_by_keywords("prior auth for a claim"), AgentId::Claims);
        assert_eq!(route_by_keywords("coding audit findings"), AgentId::Coding);
        assert_eq!(route_by_keywords("pre-cert needed under HIPAA?"), AgentId::PriorAuth);
    }

    #[test]
    fn unmatched_messages_go_to_member_service() {
        assert_eq!(route_by_keywords("find me a dermatologist"), AgentId::MemberService);
        assert_eq!(route_by_keywords(""), AgentId::MemberService);
    }

    #[tokio::test]
    async fn model_label_is_trimmed_and_lowercased() {
        let router = model_router(Reply(Ok("  Prior_Auth\n")));

        assert_eq!(router.route("anything", "req-1").await, AgentId::PriorAuth);
    }

    #[tokio::test]
    async fn invalid_model_label_falls_back() {
        let router = model_router(Reply(Ok("billing department")));

        assert_eq!(router.route("claim status", "req-2").await, AgentId::MemberService);
    }

    #[tokio::test]
    async fn model_failure_falls_back() {
        let router = model_router(Reply(Err(503)));

        assert_eq!(router.route("claim status", "req-3").await, AgentId::MemberService);
    }

    #[tokio::test]
    async fn model_timeout_falls_back() {
        let router = model_router(Stalled);

        assert_eq!(router.route("claim status", "req-4").await, AgentId::MemberService);
    }
}
