pub mod config;
pub mod domain;
pub mod errors;
pub mod text;

pub use domain::persona::{
    DocumentSet, DocumentSetId, Persona, PersonaId, PersonaUpsert, SLACK_BOT_PERSONA_PREFIX,
};
pub use domain::search::{DanswerQuote, DocumentSource, SearchDoc, SearchFeedbackType};
pub use domain::slack_bot_config::{
    AnswerFilter, ChannelConfig, ChannelConfigRequest, SlackBotConfig, SlackBotConfigId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
