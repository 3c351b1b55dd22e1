use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use danswer_core::domain::persona::{DocumentSet, DocumentSetId, Persona, PersonaId, PersonaUpsert};
use danswer_llm::models::{default_model_version, list_available_model_versions};
use danswer_llm::prompts::build_dummy_prompt;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, Deserialize)]
pub struct CreatePersonaRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub document_set_ids: Vec<i64>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub task_prompt: String,
    pub num_chunks: Option<f64>,
    pub apply_llm_relevance_filter: Option<bool>,
    pub llm_model_version_override: Option<String>,
}

impl CreatePersonaRequest {
    fn into_upsert(self, persona_id: Option<PersonaId>) -> PersonaUpsert {
        PersonaUpsert {
            persona_id,
            name: self.name,
            description: self.description,
            system_prompt: self.system_prompt,
            task_prompt: self.task_prompt,
            num_chunks: self.num_chunks,
            apply_llm_relevance_filter: self.apply_llm_relevance_filter.unwrap_or(false),
            llm_model_version_override: self.llm_model_version_override,
            retrieval_enabled: true,
            datetime_aware: true,
            document_set_ids: self.document_set_ids.into_iter().map(DocumentSetId).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentSetSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl From<DocumentSet> for DocumentSetSnapshot {
    fn from(value: DocumentSet) -> Self {
        Self { id: value.id.0, name: value.name, description: value.description }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonaSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub task_prompt: String,
    pub num_chunks: Option<f64>,
    pub apply_llm_relevance_filter: bool,
    pub llm_model_version_override: Option<String>,
    pub default_persona: bool,
    pub document_sets: Vec<DocumentSetSnapshot>,
}

impl From<Persona> for PersonaSnapshot {
    fn from(value: Persona) -> Self {
        Self {
            id: value.id.0,
            name: value.name,
            description: value.description,
            system_prompt: value.system_prompt,
            task_prompt: value.task_prompt,
            num_chunks: value.num_chunks,
            apply_llm_relevance_filter: value.apply_llm_relevance_filter,
            llm_model_version_override: value.llm_model_version_override,
            default_persona: value.default_persona,
            document_sets: value.document_sets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptExplorerParams {
    pub system_prompt: String,
    pub task_prompt: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplateResponse {
    pub final_prompt_template: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/persona", get(list_personas))
        .route("/persona/{persona_id}", get(get_persona))
        .route("/persona-utils/prompt-explorer", get(build_final_template_prompt))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/persona", post(create_persona))
        .route("/admin/persona/{persona_id}", patch(update_persona).delete(delete_persona))
        .route("/persona-utils/list-available-models", get(list_available_models))
        .route("/persona-utils/default-model", get(get_default_model))
}

pub async fn create_persona(
    State(state): State<AppState>,
    Json(body): Json<CreatePersonaRequest>,
) -> Result<Json<PersonaSnapshot>, ApiError> {
    let persona = state.personas.upsert(body.into_upsert(None)).await.map_err(|error| {
        warn!(event_name = "persona.create.failed", error = %error, "failed to create persona");
        error
    })?;

    info!(
        event_name = "persona.created",
        persona_id = persona.id.0,
        persona_name = %persona.name,
        "persona created"
    );
    Ok(Json(persona.into()))
}

pub async fn update_persona(
    Path(persona_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<CreatePersonaRequest>,
) -> Result<Json<PersonaSnapshot>, ApiError> {
    let persona = state
        .personas
        .upsert(body.into_upsert(Some(PersonaId(persona_id))))
        .await
        .map_err(|error| {
            warn!(
                event_name = "persona.update.failed",
                persona_id,
                error = %error,
                "failed to update persona"
            );
            error
        })?;

    info!(event_name = "persona.updated", persona_id, "persona updated");
    Ok(Json(persona.into()))
}

pub async fn delete_persona(
    Path(persona_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if !state.personas.mark_deleted(PersonaId(persona_id)).await? {
        return Err(ApiError::not_found(format!("Persona with ID {persona_id} not found")));
    }

    info!(event_name = "persona.deleted", persona_id, "persona marked as deleted");
    Ok(StatusCode::OK)
}

pub async fn list_personas(
    State(state): State<AppState>,
) -> Result<Json<Vec<PersonaSnapshot>>, ApiError> {
    let personas = state.personas.list(false).await?;
    Ok(Json(personas.into_iter().map(Into::into).collect()))
}

pub async fn get_persona(
    Path(persona_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<PersonaSnapshot>, ApiError> {
    match state.personas.find_by_id(PersonaId(persona_id)).await? {
        Some(persona) if !persona.deleted => Ok(Json(persona.into())),
        _ => Err(ApiError::not_found(format!("Persona with ID {persona_id} not found"))),
    }
}

pub async fn build_final_template_prompt(
    Query(params): Query<PromptExplorerParams>,
) -> Result<Json<PromptTemplateResponse>, ApiError> {
    let final_prompt_template = build_dummy_prompt(&params.system_prompt, &params.task_prompt)
        .map_err(|error| ApiError::internal(error.to_string()))?;
    Ok(Json(PromptTemplateResponse { final_prompt_template }))
}

pub async fn list_available_models(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(list_available_model_versions(state.llm.provider))
}

pub async fn get_default_model(State(state): State<AppState>) -> Json<String> {
    Json(default_model_version(&state.llm))
}
