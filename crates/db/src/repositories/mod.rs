use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use danswer_core::domain::persona::{
    DocumentSet, DocumentSetId, Persona, PersonaId, PersonaUpsert,
};
use danswer_core::domain::slack_bot_config::{ChannelConfig, SlackBotConfig, SlackBotConfigId};
use danswer_core::errors::{ApplicationError, DomainError};

pub mod document_set;
pub mod key_value;
pub mod memory;
pub mod persona;
pub mod slack_bot_config;

pub use document_set::SqlDocumentSetRepository;
pub use key_value::SqlKeyValueStore;
pub use memory::InMemoryKeyValueStore;
pub use persona::SqlPersonaRepository;
pub use slack_bot_config::SqlSlackBotConfigRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::Persistence(message),
        }
    }
}

#[async_trait]
pub trait PersonaRepository: Send + Sync {
    /// Creates a persona, or overwrites the one named by `upsert.persona_id`.
    /// Validation failures surface as `RepositoryError::Domain`.
    async fn upsert(&self, upsert: PersonaUpsert) -> Result<Persona, RepositoryError>;

    /// Returns the persona even when it has been soft deleted.
    async fn find_by_id(&self, id: PersonaId) -> Result<Option<Persona>, RepositoryError>;

    async fn list(&self, include_slack_bot_personas: bool)
        -> Result<Vec<Persona>, RepositoryError>;

    /// Soft delete. Returns false when no live persona had that id.
    async fn mark_deleted(&self, id: PersonaId) -> Result<bool, RepositoryError>;

    /// Removes the row and its document set links.
    async fn delete(&self, id: PersonaId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait DocumentSetRepository: Send + Sync {
    async fn insert(&self, name: &str, description: &str) -> Result<DocumentSet, RepositoryError>;

    /// Returns the document sets that exist among `ids`, in id order.
    async fn find_by_ids(&self, ids: &[DocumentSetId])
        -> Result<Vec<DocumentSet>, RepositoryError>;

    async fn list(&self) -> Result<Vec<DocumentSet>, RepositoryError>;
}

/// The persona a Slack bot config is saved with.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigPersona {
    None,
    Existing(PersonaId),
    /// A Slack-bot persona written in the same transaction as the config.
    Generated(PersonaUpsert),
}

#[async_trait]
pub trait SlackBotConfigRepository: Send + Sync {
    async fn insert(
        &self,
        persona: ConfigPersona,
        channel_config: ChannelConfig,
    ) -> Result<SlackBotConfig, RepositoryError>;

    /// Returns `None` when the config does not exist. A generated persona is
    /// written over the config's current Slack-bot persona unless another
    /// config shares it. A Slack-bot persona left without configs is deleted.
    async fn update(
        &self,
        id: SlackBotConfigId,
        persona: ConfigPersona,
        channel_config: ChannelConfig,
    ) -> Result<Option<SlackBotConfig>, RepositoryError>;

    /// Removes the config, and its Slack-bot persona when no other config
    /// uses it. Returns false when the config did not exist.
    async fn remove(&self, id: SlackBotConfigId) -> Result<bool, RepositoryError>;

    async fn find_by_id(
        &self,
        id: SlackBotConfigId,
    ) -> Result<Option<SlackBotConfig>, RepositoryError>;

    async fn list(&self) -> Result<Vec<SlackBotConfig>, RepositoryError>;
}

/// Small JSON blob store for settings that are edited at runtime.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>, RepositoryError>;
    async fn store(&self, key: &str, value: Value) -> Result<(), RepositoryError>;
    async fn delete(&self, key: &str) -> Result<bool, RepositoryError>;
}
