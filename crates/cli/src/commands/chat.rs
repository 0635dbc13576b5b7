use apex_agent::{AgentRuntime, TurnRequest};
use uuid::Uuid;

use super::{block_on, load_config, CommandResult, EXIT_RUNTIME_FAILURE};

#[derive(Clone, Debug)]
pub struct ChatArgs {
    pub message: String,
    pub user_id: String,
    pub agent: Option<String>,
}

/// Runs one turn against a fresh in-process runtime. A failed turn still
/// prints its result but exits non-zero.
pub fn run(args: ChatArgs) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "model_client",
                format!("failed to build model client: {error}"),
                EXIT_RUNTIME_FAILURE,
            )
        }
    };

    let request = TurnRequest {
        message: args.message,
        organization_id: "cli".to_string(),
        user_id: args.user_id,
        user_role: "member".to_string(),
        conversation_id: None,
        agent_type: args.agent,
    };
    let correlation_id = Uuid::new_v4().simple().to_string();

    match block_on("chat", runtime.process_message(request, &correlation_id)) {
        Ok(result) => {
            let exit_code = if result.error.is_some() { EXIT_RUNTIME_FAILURE } else { 0 };
            CommandResult::report(exit_code, &result)
        }
        Err(failure) => failure,
    }
}
