//! Per-channel rules deciding whether DanswerBot answers a message and
//! whether an answer it produced gets posted.

use tracing::info;

use danswer_core::domain::slack_bot_config::{AnswerFilter, ChannelConfig};

/// What the listener knows about an incoming message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage<'a> {
    pub channel_name: &'a str,
    pub text: &'a str,
    /// The bot was @-mentioned in the message.
    pub bot_tagged: bool,
    /// The message came from a slash command rather than a channel post.
    pub is_bot_msg: bool,
}

impl IncomingMessage<'_> {
    /// Explicit requests skip the channel's prefilters.
    pub fn bypasses_filters(&self) -> bool {
        self.bot_tagged || self.is_bot_msg
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotTagged,
    NotAQuestion,
    NoAnswer,
    AnswerJudgedInvalid,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotTagged => "not_tagged",
            Self::NotAQuestion => "not_a_question",
            Self::NoAnswer => "no_answer",
            Self::AnswerJudgedInvalid => "answer_judged_invalid",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Respond,
    Skip(SkipReason),
}

/// Decides whether a message should be answered at all. Channels without a
/// config are answered unconditionally.
pub fn should_respond(
    channel_config: Option<&ChannelConfig>,
    message: &IncomingMessage<'_>,
) -> Decision {
    let Some(config) = channel_config else {
        return Decision::Respond;
    };
    if message.bypasses_filters() {
        return Decision::Respond;
    }

    let decision = if config.respond_tag_only.unwrap_or(false) {
        Decision::Skip(SkipReason::NotTagged)
    } else if config.has_filter(AnswerFilter::QuestionmarkPrefilter) && !message.text.contains('?')
    {
        Decision::Skip(SkipReason::NotAQuestion)
    } else {
        Decision::Respond
    };

    if let Decision::Skip(reason) = decision {
        info!(
            event_name = "danswerbot.filters.message_skipped",
            channel = message.channel_name,
            reason = reason.as_str(),
            "not responding to message"
        );
    }
    decision
}

/// Decides whether a generated answer is posted. `answer_valid` is the
/// verdict of the answer validity check, when it was run.
pub fn should_post_answer(
    channel_config: Option<&ChannelConfig>,
    answer: Option<&str>,
    answer_valid: Option<bool>,
) -> Decision {
    let postfilter = channel_config
        .is_some_and(|config| config.has_filter(AnswerFilter::WellAnsweredPostfilter));
    if !postfilter {
        return Decision::Respond;
    }

    let decision = if answer.map_or(true, |answer| answer.trim().is_empty()) {
        Decision::Skip(SkipReason::NoAnswer)
    } else if answer_valid == Some(false) {
        Decision::Skip(SkipReason::AnswerJudgedInvalid)
    } else {
        Decision::Respond
    };

    if let Decision::Skip(reason) = decision {
        info!(
            event_name = "danswerbot.filters.answer_suppressed",
            reason = reason.as_str(),
            "answer did not pass the well-answered postfilter"
        );
    }
    decision
}

/// Team members that receive the answer directly instead of the channel.
pub fn team_members_to_tag(channel_config: Option<&ChannelConfig>) -> Vec<String> {
    channel_config
        .and_then(|config| config.respond_team_member_list.clone())
        .unwrap_or_default()
}
