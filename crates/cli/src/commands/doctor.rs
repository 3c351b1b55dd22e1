use danswer_core::config::{AppConfig, LlmProvider, LoadOptions};
use danswer_db::connect_with_settings;
use danswer_db::repositories::SqlKeyValueStore;
use danswer_llm::{get_default_llm, LlmOptions};
use danswer_slack::tokens::{fetch_tokens, TokenError};
use serde::Serialize;

use crate::commands::{block_on_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_llm(&config));
            checks.extend(check_database_and_tokens(&config));
        }
        Err(error) => {
            let details = error.to_string();
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, details));
            for name in ["llm_configuration", "database_connectivity", "slack_token_readiness"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "llm_configuration";
    let needs_key = matches!(config.llm.provider, LlmProvider::OpenAi | LlmProvider::Anthropic);
    if needs_key && config.llm.api_key.is_none() {
        return DoctorCheck::new(
            NAME,
            CheckStatus::Fail,
            format!("{} requires DANSWER_LLM_API_KEY", config.llm.provider.as_str()),
        );
    }

    match get_default_llm(&config.llm, LlmOptions::default()) {
        Ok(llm) => DoctorCheck::new(
            NAME,
            CheckStatus::Pass,
            format!("{} client ready for `{}`", config.llm.provider.as_str(), llm.model_version()),
        ),
        Err(error) => DoctorCheck::new(NAME, CheckStatus::Fail, error.to_string()),
    }
}

/// Connectivity first; stored Slack tokens are only looked up when the
/// database answers and no complete token pair is configured.
fn check_database_and_tokens(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match block_on_runtime("doctor") {
        Ok(runtime) => runtime,
        Err(failure) => {
            let check =
                DoctorCheck::new("database_connectivity", CheckStatus::Fail, failure.output);
            return vec![check];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::new(
                        "database_connectivity",
                        CheckStatus::Fail,
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::new(
                        "slack_token_readiness",
                        CheckStatus::Skipped,
                        "skipped because the database is unreachable",
                    ),
                ];
            }
        };

        let database = DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.database.url),
        );

        let store = SqlKeyValueStore::new(pool.clone());
        let tokens = match fetch_tokens(&store, &config.slack).await {
            Ok(_) if config.slack.app_token.is_some() && config.slack.bot_token.is_some() => {
                DoctorCheck::new(
                    "slack_token_readiness",
                    CheckStatus::Pass,
                    "tokens supplied through configuration",
                )
            }
            Ok(_) => DoctorCheck::new(
                "slack_token_readiness",
                CheckStatus::Pass,
                "tokens stored through the admin API",
            ),
            Err(TokenError::NotFound) => DoctorCheck::new(
                "slack_token_readiness",
                CheckStatus::Fail,
                "No tokens found: set DANSWER_BOT_SLACK_APP_TOKEN and \
                 DANSWER_BOT_SLACK_BOT_TOKEN or store them through the admin API",
            ),
            Err(error) => DoctorCheck::new(
                "slack_token_readiness",
                CheckStatus::Fail,
                format!("failed to read stored tokens (run `danswer migrate` first?): {error}"),
            ),
        };

        pool.close().await;
        vec![database, tokens]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
