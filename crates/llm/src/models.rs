//! Model versions offered when choosing a persona's model. Only OpenAI models
//! can be selected per persona.

use danswer_core::config::{LlmConfig, LlmProvider};

pub const GPT_4_MODEL_VERSIONS: &[&str] = &[
    "gpt-4-1106-preview",
    "gpt-4",
    "gpt-4-32k",
    "gpt-4-0613",
    "gpt-4-32k-0613",
    "gpt-4-0314",
    "gpt-4-32k-0314",
];

pub const GPT_3_5_TURBO_MODEL_VERSIONS: &[&str] = &[
    "gpt-3.5-turbo-1106",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-16k-0613",
    "gpt-3.5-turbo-0301",
];

pub fn list_available_model_versions(provider: LlmProvider) -> Vec<String> {
    if provider != LlmProvider::OpenAi {
        return Vec::new();
    }
    GPT_4_MODEL_VERSIONS
        .iter()
        .chain(GPT_3_5_TURBO_MODEL_VERSIONS)
        .map(|version| (*version).to_string())
        .collect()
}

pub fn default_model_version(config: &LlmConfig) -> String {
    if config.provider != LlmProvider::OpenAi {
        return String::new();
    }
    config.model.clone()
}
