use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};

use danswer_core::domain::persona::{PersonaId, SLACK_BOT_PERSONA_PREFIX};
use danswer_core::domain::slack_bot_config::{ChannelConfig, SlackBotConfig, SlackBotConfigId};

use super::persona::upsert_in_tx;
use super::{ConfigPersona, RepositoryError, SlackBotConfigRepository};
use crate::DbPool;

pub struct SqlSlackBotConfigRepository {
    pool: DbPool,
}

impl SqlSlackBotConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_slack_bot_config(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SlackBotConfig, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let persona_id: Option<i64> =
        row.try_get("persona_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let channel_config_json: String =
        row.try_get("channel_config").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let channel_config: ChannelConfig = serde_json::from_str(&channel_config_json)
        .map_err(|e| RepositoryError::Decode(format!("channel_config: {e}")))?;

    Ok(SlackBotConfig {
        id: SlackBotConfigId(id),
        persona_id: persona_id.map(PersonaId),
        channel_config,
    })
}

fn encode_channel_config(channel_config: &ChannelConfig) -> Result<String, RepositoryError> {
    serde_json::to_string(channel_config)
        .map_err(|e| RepositoryError::Decode(format!("channel_config: {e}")))
}

/// Matches a Slack-bot persona that no config other than `?` points at.
const UNSHARED_SLACK_BOT_PERSONA: &str = "id = ? AND substr(name, 1, ?) = ?
     AND NOT EXISTS (
         SELECT 1 FROM slack_bot_config
         WHERE slack_bot_config.persona_id = persona.id AND slack_bot_config.id != ?
     )";

/// Hard deletes `persona_id` if it was generated for a Slack bot config and
/// no config other than `owner` still points at it.
async fn delete_unshared_slack_bot_persona(
    tx: &mut Transaction<'_, Sqlite>,
    persona_id: PersonaId,
    owner: SlackBotConfigId,
) -> Result<(), RepositoryError> {
    sqlx::query(&format!("DELETE FROM persona WHERE {UNSHARED_SLACK_BOT_PERSONA}"))
        .bind(persona_id.0)
        .bind(SLACK_BOT_PERSONA_PREFIX.len() as i64)
        .bind(SLACK_BOT_PERSONA_PREFIX)
        .bind(owner.0)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn is_unshared_slack_bot_persona(
    tx: &mut Transaction<'_, Sqlite>,
    persona_id: PersonaId,
    owner: SlackBotConfigId,
) -> Result<bool, RepositoryError> {
    let found: Option<i64> =
        sqlx::query_scalar(&format!("SELECT id FROM persona WHERE {UNSHARED_SLACK_BOT_PERSONA}"))
            .bind(persona_id.0)
            .bind(SLACK_BOT_PERSONA_PREFIX.len() as i64)
            .bind(SLACK_BOT_PERSONA_PREFIX)
            .bind(owner.0)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(found.is_some())
}

async fn write_persona(
    tx: &mut Transaction<'_, Sqlite>,
    persona: &ConfigPersona,
) -> Result<Option<PersonaId>, RepositoryError> {
    match persona {
        ConfigPersona::None => Ok(None),
        ConfigPersona::Existing(persona_id) => Ok(Some(*persona_id)),
        ConfigPersona::Generated(upsert) => Ok(Some(upsert_in_tx(tx, upsert).await?)),
    }
}

#[async_trait::async_trait]
impl SlackBotConfigRepository for SqlSlackBotConfigRepository {
    async fn insert(
        &self,
        persona: ConfigPersona,
        channel_config: ChannelConfig,
    ) -> Result<SlackBotConfig, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let persona_id = write_persona(&mut tx, &persona).await?;

        let now = Utc::now().to_rfc3339();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO slack_bot_config (persona_id, channel_config, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(persona_id.map(|id| id.0))
        .bind(encode_channel_config(&channel_config)?)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SlackBotConfig { id: SlackBotConfigId(id), persona_id, channel_config })
    }

    async fn update(
        &self,
        id: SlackBotConfigId,
        persona: ConfigPersona,
        channel_config: ChannelConfig,
    ) -> Result<Option<SlackBotConfig>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Option<i64>> =
            sqlx::query_scalar("SELECT persona_id FROM slack_bot_config WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous_persona_id) = existing.map(|persona| persona.map(PersonaId)) else {
            return Ok(None);
        };

        // Regenerate in place only when the persona belongs to this config alone.
        let persona = match persona {
            ConfigPersona::Generated(mut upsert) if upsert.persona_id.is_none() => {
                if let Some(previous) = previous_persona_id {
                    if is_unshared_slack_bot_persona(&mut tx, previous, id).await? {
                        upsert.persona_id = Some(previous);
                    }
                }
                ConfigPersona::Generated(upsert)
            }
            persona => persona,
        };
        let persona_id = write_persona(&mut tx, &persona).await?;

        sqlx::query(
            "UPDATE slack_bot_config SET persona_id = ?, channel_config = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(persona_id.map(|id| id.0))
        .bind(encode_channel_config(&channel_config)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        if let Some(previous) = previous_persona_id {
            if Some(previous) != persona_id {
                delete_unshared_slack_bot_persona(&mut tx, previous, id).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(SlackBotConfig { id, persona_id, channel_config }))
    }

    async fn remove(&self, id: SlackBotConfigId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Option<i64>> =
            sqlx::query_scalar("SELECT persona_id FROM slack_bot_config WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(persona_id) = existing else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM slack_bot_config WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        if let Some(persona_id) = persona_id {
            delete_unshared_slack_bot_persona(&mut tx, PersonaId(persona_id), id).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn find_by_id(
        &self,
        id: SlackBotConfigId,
    ) -> Result<Option<SlackBotConfig>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, persona_id, channel_config FROM slack_bot_config WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(row_to_slack_bot_config).transpose()
    }

    async fn list(&self) -> Result<Vec<SlackBotConfig>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, persona_id, channel_config FROM slack_bot_config ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_slack_bot_config).collect()
    }
}
