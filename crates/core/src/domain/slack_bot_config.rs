use serde::{Deserialize, Serialize};

use crate::domain::persona::PersonaId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlackBotConfigId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerFilter {
    /// Drop answers the LLM judges as not actually answering the question.
    WellAnsweredPostfilter,
    /// Only respond to messages that contain a question mark.
    QuestionmarkPrefilter,
}

/// Per-channel behaviour of DanswerBot, stored as JSON alongside the config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respond_tag_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respond_team_member_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_filters: Option<Vec<AnswerFilter>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackBotConfig {
    pub id: SlackBotConfigId,
    pub persona_id: Option<PersonaId>,
    pub channel_config: ChannelConfig,
}

/// Raw channel settings as submitted by an admin.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelConfigRequest {
    pub channel_names: Vec<String>,
    pub respond_tag_only: Option<bool>,
    pub respond_team_member_list: Vec<String>,
    pub answer_filters: Vec<AnswerFilter>,
}

impl ChannelConfig {
    /// Builds a validated channel config. `current_config_id` is the config
    /// being edited, whose own channels do not count as conflicts.
    pub fn form(
        request: &ChannelConfigRequest,
        current_config_id: Option<SlackBotConfigId>,
        existing_configs: &[SlackBotConfig],
    ) -> Result<Self, DomainError> {
        if request.channel_names.is_empty() {
            return Err(DomainError::InvalidChannelConfig(
                "Must provide at least one channel name".to_string(),
            ));
        }

        let channel_names = validate_channel_names(
            &request.channel_names,
            current_config_id,
            existing_configs,
        )?;

        let respond_tag_only = request.respond_tag_only.unwrap_or(false);
        if respond_tag_only && !request.respond_team_member_list.is_empty() {
            return Err(DomainError::InvalidChannelConfig(
                "Cannot set DanswerBot to only respond to tags only and also respond to a \
                 predetermined set of users."
                    .to_string(),
            ));
        }

        Ok(Self {
            channel_names,
            respond_tag_only: request.respond_tag_only,
            respond_team_member_list: (!request.respond_team_member_list.is_empty())
                .then(|| request.respond_team_member_list.clone()),
            answer_filters: (!request.answer_filters.is_empty())
                .then(|| request.answer_filters.clone()),
        })
    }

    pub fn has_filter(&self, filter: AnswerFilter) -> bool {
        self.answer_filters.as_ref().is_some_and(|filters| filters.contains(&filter))
    }
}

/// Strips leading `#` and lowercases, the form channel names are stored in.
pub fn clean_channel_names(raw_channel_names: &[String]) -> Vec<String> {
    raw_channel_names
        .iter()
        .map(|name| name.trim().trim_start_matches('#').to_lowercase())
        .collect()
}

/// Cleans `raw_channel_names` and makes sure none of them is already claimed by
/// a config other than `current_config_id`.
pub fn validate_channel_names(
    raw_channel_names: &[String],
    current_config_id: Option<SlackBotConfigId>,
    existing_configs: &[SlackBotConfig],
) -> Result<Vec<String>, DomainError> {
    let cleaned = clean_channel_names(raw_channel_names);

    for config in existing_configs {
        if Some(config.id) == current_config_id {
            continue;
        }
        for channel_name in &cleaned {
            if config.channel_config.channel_names.contains(channel_name) {
                return Err(DomainError::ChannelAlreadyClaimed {
                    channel_name: channel_name.clone(),
                });
            }
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::{
        clean_channel_names, AnswerFilter, ChannelConfig, ChannelConfigRequest, SlackBotConfig,
        SlackBotConfigId,
    };
    use crate::errors::DomainError;

    fn existing() -> Vec<SlackBotConfig> {
        vec![SlackBotConfig {
            id: SlackBotConfigId(1),
            persona_id: None,
            channel_config: ChannelConfig {
                channel_names: vec!["support".to_string()],
                ..ChannelConfig::default()
            },
        }]
    }

    fn request(names: &[&str]) -> ChannelConfigRequest {
        ChannelConfigRequest {
            channel_names: names.iter().map(|name| name.to_string()).collect(),
            ..ChannelConfigRequest::default()
        }
    }

    #[test]
    fn channel_names_are_stripped_and_lowercased() {
        let cleaned = clean_channel_names(&["#Support".to_string(), "eng-Help".to_string()]);
        assert_eq!(cleaned, vec!["support".to_string(), "eng-help".to_string()]);
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        let result = ChannelConfig::form(&request(&[]), None, &[]);
        assert!(matches!(
            result,
            Err(DomainError::InvalidChannelConfig(message)) if message == "Must provide at least one channel name"
        ));
    }

    #[test]
    fn channel_claimed_by_other_config_is_rejected() {
        let result = ChannelConfig::form(&request(&["#SUPPORT"]), None, &existing());
        assert_eq!(
            result,
            Err(DomainError::ChannelAlreadyClaimed { channel_name: "support".to_string() })
        );
    }

    #[test]
    fn editing_config_may_keep_its_own_channels() {
        let config =
            ChannelConfig::form(&request(&["support"]), Some(SlackBotConfigId(1)), &existing())
                .expect("own channels are not conflicts");
        assert_eq!(config.channel_names, vec!["support".to_string()]);
        assert_eq!(config.respond_tag_only, None);
        assert_eq!(config.respond_team_member_list, None);
        assert_eq!(config.answer_filters, None);
    }

    #[test]
    fn tag_only_conflicts_with_team_member_list() {
        let result = ChannelConfig::form(
            &ChannelConfigRequest {
                respond_tag_only: Some(true),
                respond_team_member_list: vec!["alice@example.com".to_string()],
                ..request(&["ops"])
            },
            None,
            &[],
        );
        assert!(matches!(result, Err(DomainError::InvalidChannelConfig(message)) if message.contains("tags only")));
    }

    #[test]
    fn optional_settings_are_kept_when_present() {
        let config = ChannelConfig::form(
            &ChannelConfigRequest {
                respond_tag_only: Some(false),
                respond_team_member_list: vec!["alice@example.com".to_string()],
                answer_filters: vec![AnswerFilter::QuestionmarkPrefilter],
                ..request(&["ops"])
            },
            None,
            &existing(),
        )
        .expect("valid config");

        assert_eq!(config.respond_tag_only, Some(false));
        assert!(config.has_filter(AnswerFilter::QuestionmarkPrefilter));
        assert!(!config.has_filter(AnswerFilter::WellAnsweredPostfilter));

        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["answer_filters"][0], "questionmark_prefilter");
        assert_eq!(json["respond_team_member_list"][0], "alice@example.com");
    }
}
