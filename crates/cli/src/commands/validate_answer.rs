use danswer_core::config::{AppConfig, LoadOptions};
use danswer_llm::{get_answer_validity, get_default_llm, LlmOptions};
use serde_json::json;

use crate::commands::{block_on_runtime, CommandResult};

pub fn run(query: &str, answer: &str, use_fast_llm: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "validate-answer",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let options = LlmOptions { use_fast_llm, ..LlmOptions::default() };
    let llm = match get_default_llm(&config.llm, options) {
        Ok(llm) => llm,
        Err(error) => {
            return CommandResult::failure("validate-answer", "llm_client", error.to_string(), 4);
        }
    };

    let runtime = match block_on_runtime("validate-answer") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(get_answer_validity(llm.as_ref(), query, answer)) {
        Ok(valid) => CommandResult::success_with_details(
            "validate-answer",
            if valid { "answer judged valid" } else { "answer judged invalid" },
            Some(json!({ "valid": valid, "model": llm.model_version() })),
        ),
        Err(error) => {
            CommandResult::failure("validate-answer", "llm_request", format!("{error:#}"), 5)
        }
    }
}
