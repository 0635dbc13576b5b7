use apex_agent::AgentRuntime;
use apex_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::{CommandResult, EXIT_CONFIG_FAILURE, EXIT_RUNTIME_FAILURE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code_for(&report);

    if json_output {
        return CommandResult::report(exit_code, &report);
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_model_credential(&config));
            checks.push(check_agent_runtime(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["model_credential", "agent_runtime"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_fail = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_model_credential(config: &AppConfig) -> DoctorCheck {
    if config.llm.has_credential() {
        return DoctorCheck {
            name: "model_credential",
            status: CheckStatus::Pass,
            details: format!("credential present for `{}`", config.llm.model),
        };
    }

    DoctorCheck {
        name: "model_credential",
        status: CheckStatus::Warn,
        details: "no model credential; keyword routing and fallback responses only".to_string(),
    }
}

fn check_agent_runtime(config: &AppConfig) -> DoctorCheck {
    match AgentRuntime::from_config(config) {
        Ok(runtime) => DoctorCheck {
            name: "agent_runtime",
            status: CheckStatus::Pass,
            details: format!(
                "{} agents, {} routing",
                runtime.catalog().profiles().count(),
                runtime.router().mode()
            ),
        },
        Err(error) => DoctorCheck {
            name: "agent_runtime",
            status: CheckStatus::Fail,
            details: format!("failed to build model client: {error}"),
        },
    }
}

fn exit_code_for(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };

    if failed("config_validation") {
        EXIT_CONFIG_FAILURE
    } else if report.overall_status == CheckStatus::Fail {
        EXIT_RUNTIME_FAILURE
    } else {
        0
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
