use std::env;
use std::sync::{Mutex, OnceLock};

use apex_cli::commands::chat::{self, ChatArgs};
use apex_cli::commands::{config, doctor, route};
use serde_json::Value;

#[test]
fn doctor_passes_without_model_credential() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "fallback mode is still ready");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][1]["status"], "warn");
        assert_eq!(payload["checks"][2]["details"], "5 agents, keyword routing");
    });
}

#[test]
fn doctor_reports_config_failure_with_exit_code_two() {
    with_env(&[("APEX_AGENTS_HISTORY_WINDOW", "0")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 2);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] agent_runtime"));
    });
}

#[test]
fn doctor_reports_model_routing_when_credential_present() {
    with_env(&[("APEX_LLM_API_KEY", "gem-doctor-key")], || {
        let payload = parse_payload(&doctor::run(true).output);
        assert_eq!(payload["checks"][1]["status"], "pass");
        assert_eq!(payload["checks"][2]["details"], "5 agents, model routing");
    });
}

#[test]
fn config_redacts_api_key_and_attributes_env_source() {
    with_env(&[("GEMINI_API_KEY", "gem-very-secret"), ("APEX_SERVER_PORT", "9100")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        assert!(!result.output.contains("gem-very-secret"));
        assert!(result
            .output
            .contains("- llm.api_key = <redacted> (source: env (GEMINI_API_KEY))"));
        assert!(result.output.contains("- server.port = 9100 (source: env (APEX_SERVER_PORT))"));
        assert!(result.output.contains("- llm.model = gemini-2.0-flash (source: default)"));
    });
}

#[test]
fn config_returns_structured_failure_on_invalid_override() {
    with_env(&[("APEX_LLM_TIMEOUT_SECS", "soon")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn route_uses_keyword_strategy_without_credential() {
    with_env(&[], || {
        let result = route::run("Why was my claim denied last week?");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["agent_type"], "claims");
        assert_eq!(payload["router_mode"], "keyword");
        assert_eq!(payload["agent_name"], "Claims Intelligence Agent");
    });
}

#[test]
fn route_defaults_to_member_service() {
    with_env(&[], || {
        let payload = parse_payload(&route::run("hello there").output);
        assert_eq!(payload["agent_type"], "member_service");
    });
}

#[test]
fn chat_returns_fallback_turn_without_credential() {
    with_env(&[], || {
        let result = chat::run(ChatArgs {
            message: "Is prior authorization required for an MRI?".to_string(),
            user_id: "u-7".to_string(),
            agent: None,
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["agent_type"], "prior_auth");
        assert_eq!(payload["conversation_id"], "u-7:prior_auth");
        assert_eq!(payload["requires_hitl"], false);
        assert_eq!(payload["metadata"]["message_count"], 2);
        let response = payload["response"].as_str().unwrap_or_default();
        assert!(response.starts_with("[PRIOR_AUTH Agent] I received your message"));
    });
}

#[test]
fn chat_honors_forced_agent() {
    with_env(&[], || {
        let payload = parse_payload(
            &chat::run(ChatArgs {
                message: "hello".to_string(),
                user_id: "u-8".to_string(),
                agent: Some("coding".to_string()),
            })
            .output,
        );
        assert_eq!(payload["agent_type"], "coding");
        assert_eq!(payload["conversation_id"], "u-8:coding");
    });
}

#[test]
fn chat_reports_config_failure() {
    with_env(&[("APEX_LOG_FORMAT", "xml")], || {
        let result = chat::run(ChatArgs {
            message: "hello".to_string(),
            user_id: "u-9".to_string(),
            agent: None,
        });
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "APEX_LLM_API_KEY",
        "GEMINI_API_KEY",
        "APEX_LLM_BASE_URL",
        "APEX_LLM_MODEL",
        "APEX_LLM_TEMPERATURE",
        "APEX_LLM_TIMEOUT_SECS",
        "APEX_AGENTS_HISTORY_WINDOW",
        "APEX_AGENTS_MAX_CONVERSATIONS",
        "APEX_SERVER_BIND_ADDRESS",
        "APEX_SERVER_PORT",
        "APEX_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "APEX_SERVER_CORS_ALLOWED_ORIGINS",
        "APEX_LOGGING_LEVEL",
        "APEX_LOGGING_FORMAT",
        "APEX_LOG_LEVEL",
        "APEX_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
