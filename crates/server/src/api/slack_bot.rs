use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use danswer_core::domain::persona::{DocumentSetId, PersonaId, PersonaUpsert};
use danswer_core::domain::slack_bot_config::{
    AnswerFilter, ChannelConfig, ChannelConfigRequest, SlackBotConfig, SlackBotConfigId,
};
use danswer_db::repositories::ConfigPersona;
use danswer_slack::tokens::{fetch_tokens, save_tokens, SlackBotTokens};

use super::persona::PersonaSnapshot;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SlackBotConfigCreationRequest {
    #[serde(default)]
    pub document_sets: Vec<i64>,
    pub persona_id: Option<i64>,
    #[serde(default)]
    pub channel_names: Vec<String>,
    pub respond_tag_only: Option<bool>,
    #[serde(default)]
    pub respond_team_member_list: Vec<String>,
    #[serde(default)]
    pub answer_filters: Vec<AnswerFilter>,
}

impl SlackBotConfigCreationRequest {
    fn channel_config_request(&self) -> ChannelConfigRequest {
        ChannelConfigRequest {
            channel_names: self.channel_names.clone(),
            respond_tag_only: self.respond_tag_only,
            respond_team_member_list: self.respond_team_member_list.clone(),
            answer_filters: self.answer_filters.clone(),
        }
    }

    fn document_set_ids(&self) -> Vec<DocumentSetId> {
        self.document_sets.iter().copied().map(DocumentSetId).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlackBotConfigResponse {
    pub id: i64,
    pub persona: Option<PersonaSnapshot>,
    pub channel_config: ChannelConfig,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/slack-bot/config", get(list_slack_bot_configs).post(create_slack_bot_config))
        .route(
            "/admin/slack-bot/config/{slack_bot_config_id}",
            patch(patch_slack_bot_config).delete(delete_slack_bot_config),
        )
        .route("/admin/slack-bot/tokens", get(get_tokens).put(put_tokens))
}

async fn form_channel_config(
    state: &AppState,
    request: &SlackBotConfigCreationRequest,
    current_config_id: Option<SlackBotConfigId>,
) -> Result<ChannelConfig, ApiError> {
    let existing_configs = state.slack_bot_configs.list().await?;
    let channel_request = request.channel_config_request();
    Ok(ChannelConfig::form(&channel_request, current_config_id, &existing_configs)?)
}

/// An explicitly chosen persona must exist and be live.
async fn ensure_persona_usable(state: &AppState, persona_id: PersonaId) -> Result<(), ApiError> {
    match state.personas.find_by_id(persona_id).await? {
        Some(persona) if !persona.deleted => Ok(()),
        _ => Err(ApiError::bad_request(format!("Persona with ID {} does not exist", persona_id.0))),
    }
}

async fn to_response(
    state: &AppState,
    config: SlackBotConfig,
) -> Result<SlackBotConfigResponse, ApiError> {
    let persona = match config.persona_id {
        Some(persona_id) => state.personas.find_by_id(persona_id).await?.map(Into::into),
        None => None,
    };
    Ok(SlackBotConfigResponse { id: config.id.0, persona, channel_config: config.channel_config })
}

/// An explicit persona wins; otherwise document sets get a generated persona.
async fn choose_persona(
    state: &AppState,
    request: &SlackBotConfigCreationRequest,
    channel_config: &ChannelConfig,
) -> Result<ConfigPersona, ApiError> {
    if let Some(persona_id) = request.persona_id.map(PersonaId) {
        ensure_persona_usable(state, persona_id).await?;
        return Ok(ConfigPersona::Existing(persona_id));
    }
    if request.document_sets.is_empty() {
        return Ok(ConfigPersona::None);
    }
    Ok(ConfigPersona::Generated(PersonaUpsert::for_slack_bot(
        &channel_config.channel_names,
        request.document_set_ids(),
        None,
    )))
}

pub async fn create_slack_bot_config(
    State(state): State<AppState>,
    Json(body): Json<SlackBotConfigCreationRequest>,
) -> Result<Json<SlackBotConfigResponse>, ApiError> {
    let channel_config = form_channel_config(&state, &body, None).await?;
    let persona = choose_persona(&state, &body, &channel_config).await?;

    let config = state.slack_bot_configs.insert(persona, channel_config).await?;
    info!(
        event_name = "slack_bot_config.created",
        slack_bot_config_id = config.id.0,
        persona_id = config.persona_id.map(|id| id.0),
        "slack bot config created"
    );
    Ok(Json(to_response(&state, config).await?))
}

pub async fn patch_slack_bot_config(
    Path(slack_bot_config_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<SlackBotConfigCreationRequest>,
) -> Result<Json<SlackBotConfigResponse>, ApiError> {
    let config_id = SlackBotConfigId(slack_bot_config_id);
    if state.slack_bot_configs.find_by_id(config_id).await?.is_none() {
        return Err(ApiError::not_found("Slack bot config not found"));
    }
    let channel_config = form_channel_config(&state, &body, Some(config_id)).await?;
    let persona = choose_persona(&state, &body, &channel_config).await?;

    let config = state
        .slack_bot_configs
        .update(config_id, persona, channel_config)
        .await?
        .ok_or_else(|| ApiError::not_found("Slack bot config not found"))?;
    info!(
        event_name = "slack_bot_config.updated",
        slack_bot_config_id,
        persona_id = config.persona_id.map(|id| id.0),
        "slack bot config updated"
    );
    Ok(Json(to_response(&state, config).await?))
}

pub async fn delete_slack_bot_config(
    Path(slack_bot_config_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if !state.slack_bot_configs.remove(SlackBotConfigId(slack_bot_config_id)).await? {
        return Err(ApiError::not_found("Slack bot config not found"));
    }

    info!(event_name = "slack_bot_config.removed", slack_bot_config_id, "slack bot config removed");
    Ok(StatusCode::OK)
}

pub async fn list_slack_bot_configs(
    State(state): State<AppState>,
) -> Result<Json<Vec<SlackBotConfigResponse>>, ApiError> {
    let configs = state.slack_bot_configs.list().await?;
    let mut responses = Vec::with_capacity(configs.len());
    for config in configs {
        responses.push(to_response(&state, config).await?);
    }
    Ok(Json(responses))
}

pub async fn put_tokens(
    State(state): State<AppState>,
    Json(tokens): Json<SlackBotTokens>,
) -> Result<StatusCode, ApiError> {
    save_tokens(state.key_value_store.as_ref(), &tokens).await?;
    Ok(StatusCode::OK)
}

pub async fn get_tokens(State(state): State<AppState>) -> Result<Json<SlackBotTokens>, ApiError> {
    Ok(Json(fetch_tokens(state.key_value_store.as_ref(), &state.slack).await?))
}
