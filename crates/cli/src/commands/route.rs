use apex_agent::AgentRuntime;
use apex_core::domain::agent::AgentId;
use serde::Serialize;
use uuid::Uuid;

use super::{block_on, load_config, CommandResult, EXIT_RUNTIME_FAILURE};

#[derive(Debug, Serialize)]
struct RouteReport {
    command: &'static str,
    status: &'static str,
    agent_type: AgentId,
    agent_name: &'static str,
    router_mode: &'static str,
    correlation_id: String,
}

pub fn run(message: &str) -> CommandResult {
    let config = match load_config("route") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "route",
                "model_client",
                format!("failed to build model client: {error}"),
                EXIT_RUNTIME_FAILURE,
            )
        }
    };

    let correlation_id = Uuid::new_v4().simple().to_string();
    let agent_type = match block_on("route", runtime.router().route(message, &correlation_id)) {
        Ok(agent_type) => agent_type,
        Err(failure) => return failure,
    };

    CommandResult::report(
        0,
        &RouteReport {
            command: "route",
            status: "ok",
            agent_type,
            agent_name: runtime.catalog().get(agent_type).name,
            router_mode: runtime.router().mode(),
            correlation_id,
        },
    )
}
