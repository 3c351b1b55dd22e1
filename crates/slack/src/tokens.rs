//! Slack app/bot token storage. Tokens set through configuration win over
//! tokens saved at runtime from the admin API.

use std::fmt;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use danswer_core::config::SlackConfig;
use danswer_db::repositories::{KeyValueStore, RepositoryError};

pub const SLACK_BOT_TOKENS_CONFIG_KEY: &str = "slack_bot_tokens_config_key";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackBotTokens {
    pub bot_token: String,
    pub app_token: String,
}

impl fmt::Debug for SlackBotTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackBotTokens")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("No tokens found")]
    NotFound,
    #[error("stored Slack bot tokens are unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub async fn save_tokens(
    store: &dyn KeyValueStore,
    tokens: &SlackBotTokens,
) -> Result<(), TokenError> {
    store.store(SLACK_BOT_TOKENS_CONFIG_KEY, serde_json::to_value(tokens)?).await?;
    info!(event_name = "danswerbot.tokens.saved", "stored Slack bot tokens");
    Ok(())
}

/// Returns the configured tokens when both are set, otherwise the stored ones.
pub async fn fetch_tokens(
    store: &dyn KeyValueStore,
    slack: &SlackConfig,
) -> Result<SlackBotTokens, TokenError> {
    if let (Some(app_token), Some(bot_token)) = (&slack.app_token, &slack.bot_token) {
        return Ok(SlackBotTokens {
            bot_token: bot_token.expose_secret().to_string(),
            app_token: app_token.expose_secret().to_string(),
        });
    }

    let stored = store.load(SLACK_BOT_TOKENS_CONFIG_KEY).await?.ok_or(TokenError::NotFound)?;
    Ok(serde_json::from_value(stored)?)
}
