use std::sync::Arc;

use secrecy::SecretString;

use danswer_core::config::{AppConfig, LlmConfig, SlackConfig};
use danswer_db::repositories::{
    DocumentSetRepository, KeyValueStore, PersonaRepository, SlackBotConfigRepository,
    SqlDocumentSetRepository, SqlKeyValueStore, SqlPersonaRepository,
    SqlSlackBotConfigRepository,
};
use danswer_db::DbPool;

/// Shared handler state. Repositories sit behind trait objects so tests can
/// swap the key-value store.
#[derive(Clone)]
pub struct AppState {
    pub personas: Arc<dyn PersonaRepository>,
    pub document_sets: Arc<dyn DocumentSetRepository>,
    pub slack_bot_configs: Arc<dyn SlackBotConfigRepository>,
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub llm: LlmConfig,
    pub slack: SlackConfig,
    pub admin_api_key: Option<SecretString>,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: &AppConfig) -> Self {
        Self {
            personas: Arc::new(SqlPersonaRepository::new(db_pool.clone())),
            document_sets: Arc::new(SqlDocumentSetRepository::new(db_pool.clone())),
            slack_bot_configs: Arc::new(SqlSlackBotConfigRepository::new(db_pool.clone())),
            key_value_store: Arc::new(SqlKeyValueStore::new(db_pool)),
            llm: config.llm.clone(),
            slack: config.slack.clone(),
            admin_api_key: config.server.admin_api_key.clone(),
        }
    }
}
