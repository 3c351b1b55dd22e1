use std::env;
use std::sync::{Mutex, OnceLock};

use danswer_cli::commands::{doctor, migrate, validate_answer};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("DANSWER_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("DANSWER_DATABASE_URL", "postgres://localhost/danswer")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_reports_each_check_as_json() {
    with_env(
        &[
            ("DANSWER_DATABASE_URL", "sqlite::memory:"),
            ("DANSWER_LLM_API_KEY", "sk-test"),
            ("DANSWER_BOT_SLACK_APP_TOKEN", "xapp-test"),
            ("DANSWER_BOT_SLACK_BOT_TOKEN", "xoxb-test"),
        ],
        || {
            let result = doctor::run(true);
            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "pass", "report: {report}");
            assert_eq!(result.exit_code, 0);

            let names: Vec<&str> = report["checks"]
                .as_array()
                .expect("checks")
                .iter()
                .filter_map(|check| check["name"].as_str())
                .collect();
            assert_eq!(
                names,
                [
                    "config_validation",
                    "llm_configuration",
                    "database_connectivity",
                    "slack_token_readiness"
                ]
            );
        },
    );
}

#[test]
fn doctor_flags_missing_llm_key_and_tokens() {
    with_env(&[("DANSWER_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        let status_of = |name: &str| {
            report["checks"]
                .as_array()
                .and_then(|checks| checks.iter().find(|check| check["name"] == name))
                .map(|check| check["status"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(status_of("llm_configuration"), json!("fail"));
        assert_eq!(status_of("database_connectivity"), json!("pass"));
        assert_eq!(status_of("slack_token_readiness"), json!("fail"));
    });
}

#[test]
fn doctor_human_output_lists_checks() {
    with_env(&[("DANSWER_DATABASE_URL", "mysql://nope")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] database_connectivity"));
    });
}

#[test]
fn validate_answer_reports_the_llm_verdict() {
    let mock_runtime = tokio::runtime::Runtime::new().expect("mock runtime");
    let server = mock_runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": "```\n1. False\n2. False\n3. True\nFinal Answer: Invalid\n```"
                }}]
            })))
            .mount(&server)
            .await;
        server
    });
    let base_url = format!("{}/v1", server.uri());

    with_env(
        &[
            ("DANSWER_DATABASE_URL", "sqlite::memory:"),
            ("DANSWER_LLM_API_KEY", "sk-test"),
            ("DANSWER_LLM_BASE_URL", base_url.as_str()),
            ("DANSWER_LLM_MAX_RETRIES", "0"),
        ],
        || {
            let result = validate_answer::run("Who owns billing?", "I don't know.", false);
            assert_eq!(result.exit_code, 0, "output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "validate-answer");
            assert_eq!(payload["message"], "answer judged invalid");
            assert_eq!(payload["details"]["valid"], json!(false));
            assert_eq!(payload["details"]["model"], "gpt-3.5-turbo-16k-0613");
        },
    );

    drop(server);
}

#[test]
fn validate_answer_fails_cleanly_on_bad_config() {
    with_env(&[("DANSWER_LLM_PROVIDER", "gpt4all")], || {
        let result = validate_answer::run("q", "a", true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
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
        "DANSWER_DATABASE_URL",
        "DANSWER_DATABASE_MAX_CONNECTIONS",
        "DANSWER_DATABASE_TIMEOUT_SECS",
        "DANSWER_BOT_SLACK_APP_TOKEN",
        "DANSWER_BOT_SLACK_BOT_TOKEN",
        "DANSWER_BOT_NUM_DOCS_TO_DISPLAY",
        "DANSWER_BOT_ENABLE_DOC_FEEDBACK",
        "DANSWER_LLM_PROVIDER",
        "DANSWER_LLM_API_KEY",
        "GEN_AI_API_KEY",
        "DANSWER_LLM_BASE_URL",
        "DANSWER_LLM_MODEL",
        "DANSWER_LLM_FAST_MODEL",
        "DANSWER_LLM_TIMEOUT_SECS",
        "DANSWER_LLM_MAX_RETRIES",
        "DANSWER_SERVER_BIND_ADDRESS",
        "DANSWER_SERVER_PORT",
        "DANSWER_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "DANSWER_ADMIN_API_KEY",
        "DANSWER_LOGGING_LEVEL",
        "DANSWER_LOGGING_FORMAT",
        "DANSWER_LOG_LEVEL",
        "DANSWER_LOG_FORMAT",
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
