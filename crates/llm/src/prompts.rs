//! Prompt templates rendered with tera.

use tera::{Context, Tera};
use thiserror::Error;

const ANSWER_VALIDITY_TEMPLATE: &str = "answer_validity.txt";
const PERSONA_QA_TEMPLATE: &str = "persona_qa.txt";

const DUMMY_CONTEXT_DOCS: &[&str] = &["<CONTEXT_DOC_A>", "<CONTEXT_DOC_B>", "<CONTEXT_DOC_C>"];
const DUMMY_USER_QUERY: &str = "<USER_QUERY>";

#[derive(Debug, Error)]
#[error("failed to render prompt: {0}")]
pub struct PromptError(#[from] tera::Error);

fn templates() -> Result<Tera, PromptError> {
    let mut tera = Tera::default();
    tera.add_raw_template(
        ANSWER_VALIDITY_TEMPLATE,
        include_str!("../templates/answer_validity.txt"),
    )?;
    tera.add_raw_template(PERSONA_QA_TEMPLATE, include_str!("../templates/persona_qa.txt"))?;
    Ok(tera)
}

pub fn build_answer_validity_prompt(query: &str, answer: &str) -> Result<String, PromptError> {
    let mut context = Context::new();
    context.insert("user_query", query);
    context.insert("llm_answer", answer);
    Ok(templates()?.render(ANSWER_VALIDITY_TEMPLATE, &context)?.trim().to_string())
}

/// Renders a persona's QA prompt with placeholder documents and question, so
/// admins can see the final prompt their system and task text produce.
pub fn build_dummy_prompt(system_prompt: &str, task_prompt: &str) -> Result<String, PromptError> {
    let mut context = Context::new();
    context.insert("system_prompt", system_prompt.trim());
    context.insert("task_prompt", task_prompt.trim());
    context.insert("context_docs", &DUMMY_CONTEXT_DOCS.join("\n\n"));
    context.insert("user_query", DUMMY_USER_QUERY);
    Ok(templates()?.render(PERSONA_QA_TEMPLATE, &context)?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::{build_answer_validity_prompt, build_dummy_prompt};

    #[test]
    fn answer_validity_prompt_embeds_query_and_answer_verbatim() {
        let prompt = build_answer_validity_prompt("What is <b>?", "It's \"bold\" & loud")
            .expect("prompt renders");
        assert!(prompt.contains("Query: What is <b>?"));
        assert!(prompt.contains("Answer: It's \"bold\" & loud"));
        assert!(prompt.ends_with("it is Invalid."));
    }

    #[test]
    fn dummy_prompt_shows_placeholders_around_persona_text() {
        let prompt = build_dummy_prompt("You are a helpful assistant.", "Answer concisely.")
            .expect("prompt renders");
        assert!(prompt.starts_with("You are a helpful assistant."));
        assert!(prompt.contains("<CONTEXT_DOC_A>\n\n<CONTEXT_DOC_B>\n\n<CONTEXT_DOC_C>"));
        assert!(prompt.contains("Answer concisely."));
        assert!(prompt.ends_with("QUERY: <USER_QUERY>\nRESPONSE:"));
    }
}
