//! LLM access for DanswerBot: provider clients behind [`llm::LlmClient`], the
//! configured-model factory, persona prompt rendering and the answer validity
//! check used by the Slack well-answered postfilter.

pub mod answer_validation;
pub mod factory;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use answer_validation::get_answer_validity;
pub use factory::{get_default_llm, LlmOptions};
pub use llm::LlmClient;
