use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Name prefix of personas generated on behalf of a Slack bot config. These
/// are owned by the config and hidden from the public persona listing.
pub const SLACK_BOT_PERSONA_PREFIX: &str = "__slack_bot_persona__";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSetId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub id: DocumentSetId,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub task_prompt: String,
    pub num_chunks: Option<f64>,
    pub apply_llm_relevance_filter: bool,
    pub llm_model_version_override: Option<String>,
    pub retrieval_enabled: bool,
    pub datetime_aware: bool,
    pub default_persona: bool,
    pub deleted: bool,
    pub document_sets: Vec<DocumentSet>,
}

impl Persona {
    pub fn is_slack_bot_persona(&self) -> bool {
        self.name.starts_with(SLACK_BOT_PERSONA_PREFIX)
    }
}

/// Everything needed to create a persona or overwrite an existing one.
/// `persona_id` selects update semantics.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonaUpsert {
    pub persona_id: Option<PersonaId>,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub task_prompt: String,
    pub num_chunks: Option<f64>,
    pub apply_llm_relevance_filter: bool,
    pub llm_model_version_override: Option<String>,
    pub retrieval_enabled: bool,
    pub datetime_aware: bool,
    pub document_set_ids: Vec<DocumentSetId>,
}

impl PersonaUpsert {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidPersona("Persona name must not be empty".to_string()));
        }

        if let Some(num_chunks) = self.num_chunks {
            if !num_chunks.is_finite() || num_chunks < 0.0 {
                return Err(DomainError::InvalidPersona(format!(
                    "num_chunks must be a non-negative number, got {num_chunks}"
                )));
            }
        }

        if let Some(model) = &self.llm_model_version_override {
            if model.trim().is_empty() {
                return Err(DomainError::InvalidPersona(
                    "llm_model_version_override must not be blank when set".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Persona owned by a Slack bot config, scoped to the given document sets.
    pub fn for_slack_bot(
        channel_names: &[String],
        document_set_ids: Vec<DocumentSetId>,
        existing_persona_id: Option<PersonaId>,
    ) -> Self {
        Self {
            persona_id: existing_persona_id,
            name: slack_bot_persona_name(channel_names),
            description: String::new(),
            system_prompt: String::new(),
            task_prompt: String::new(),
            num_chunks: None,
            apply_llm_relevance_filter: true,
            llm_model_version_override: None,
            retrieval_enabled: true,
            datetime_aware: false,
            document_set_ids,
        }
    }
}

/// Checks that `existing` may be overwritten by an upsert.
pub fn ensure_updatable(existing: &Persona) -> Result<(), DomainError> {
    if existing.deleted {
        return Err(DomainError::InvalidPersona(format!(
            "Persona with ID {} has been deleted and cannot be updated",
            existing.id.0
        )));
    }
    if existing.default_persona {
        return Err(DomainError::InvalidPersona("Cannot update a default persona".to_string()));
    }
    Ok(())
}

pub fn slack_bot_persona_name(channel_names: &[String]) -> String {
    format!("{SLACK_BOT_PERSONA_PREFIX}{}", channel_names.join("-"))
}

#[cfg(test)]
mod tests {
    use super::{
        ensure_updatable, slack_bot_persona_name, DocumentSetId, Persona, PersonaId,
        PersonaUpsert,
    };
    use crate::errors::DomainError;

    fn persona() -> Persona {
        Persona {
            id: PersonaId(7),
            name: "Support".to_string(),
            description: "Answers support questions".to_string(),
            system_prompt: "You are helpful".to_string(),
            task_prompt: "Answer concisely".to_string(),
            num_chunks: Some(10.0),
            apply_llm_relevance_filter: false,
            llm_model_version_override: None,
            retrieval_enabled: true,
            datetime_aware: true,
            default_persona: false,
            deleted: false,
            document_sets: Vec::new(),
        }
    }

    #[test]
    fn slack_bot_persona_name_joins_channels() {
        let name = slack_bot_persona_name(&["support".to_string(), "eng-help".to_string()]);
        assert_eq!(name, "__slack_bot_persona__support-eng-help");
    }

    #[test]
    fn slack_bot_upsert_enables_relevance_filter_and_is_recognised() {
        let upsert =
            PersonaUpsert::for_slack_bot(&["ops".to_string()], vec![DocumentSetId(3)], None);
        assert!(upsert.apply_llm_relevance_filter);
        assert!(!upsert.datetime_aware);
        assert!(upsert.validate().is_ok());

        let generated = Persona { name: upsert.name.clone(), ..persona() };
        assert!(generated.is_slack_bot_persona());
        assert!(!persona().is_slack_bot_persona());
    }

    #[test]
    fn blank_name_and_negative_chunks_are_rejected() {
        let mut upsert = PersonaUpsert::for_slack_bot(&["ops".to_string()], vec![], None);
        upsert.name = "   ".to_string();
        assert!(matches!(upsert.validate(), Err(DomainError::InvalidPersona(_))));

        upsert.name = "ok".to_string();
        upsert.num_chunks = Some(-1.0);
        assert!(matches!(upsert.validate(), Err(DomainError::InvalidPersona(message)) if message.contains("num_chunks")));
    }

    #[test]
    fn deleted_and_default_personas_are_not_updatable() {
        assert!(ensure_updatable(&persona()).is_ok());
        assert!(ensure_updatable(&Persona { deleted: true, ..persona() }).is_err());
        assert!(ensure_updatable(&Persona { default_persona: true, ..persona() }).is_err());
    }
}
