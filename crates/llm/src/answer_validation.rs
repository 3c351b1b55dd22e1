//! Judges whether an LLM answer actually answers the query, for the Slack
//! well-answered postfilter.

use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::llm::LlmClient;
use crate::prompts::build_answer_validity_prompt;

/// Asks the LLM once. Anything other than a final verdict of `invalid` keeps
/// the answer.
pub async fn get_answer_validity(llm: &dyn LlmClient, query: &str, answer: &str) -> Result<bool> {
    let started = Instant::now();
    let prompt = build_answer_validity_prompt(query, answer)?;
    let model_output = llm.complete(&prompt).await?;
    debug!(
        event_name = "llm.answer_validity.output",
        output = %model_output,
        "raw answer validity output"
    );

    let validity = extract_validity(&model_output);
    info!(
        event_name = "llm.answer_validity.checked",
        model = llm.model_version(),
        valid = validity,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "answer validity checked"
    );
    Ok(validity)
}

pub fn extract_validity(model_output: &str) -> bool {
    let cleaned = model_output.trim().trim_matches('`').trim();
    !cleaned
        .split_whitespace()
        .last()
        .is_some_and(|verdict| verdict.eq_ignore_ascii_case("invalid"))
}
