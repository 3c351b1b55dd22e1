use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use danswer_core::domain::search::{DanswerQuote, DocumentSource, SearchDoc, SearchFeedbackType};
use danswer_core::text::replace_whitespaces_w_space;

use crate::utils::{
    build_feedback_block_id, remove_slack_text_interactions, translate_vespa_highlight_to_slack,
    BlockIdError,
};

pub const LIKE_BLOCK_ACTION_ID: &str = "feedback-like";
pub const DISLIKE_BLOCK_ACTION_ID: &str = "feedback-dislike";

const MAX_QUOTES_PER_DOCUMENT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// Dialog Slack shows before a button's action is sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmObject {
    pub title: TextObject,
    pub text: TextObject,
    pub confirm: TextObject,
    pub deny: TextObject,
}

impl ConfirmObject {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: TextObject::plain(title),
            text: TextObject::mrkdwn(text),
            confirm: TextObject::plain("Yes"),
            deny: TextObject::plain("No"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "button")]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ConfirmObject>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            confirm: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn confirm(mut self, confirm: ConfirmObject) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: TextObject,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: TextObject,
    },
    Divider {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Actions {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<ButtonElement>,
    },
    Context {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<TextObject>,
    },
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header { block_id: None, text: TextObject::plain(text) }
    }

    /// Sections default to markdown, as Slack renders bot answers.
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section { block_id: None, text: TextObject::mrkdwn(text) }
    }

    pub fn divider() -> Self {
        Self::Divider { block_id: None }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Header { block_id, .. }
            | Self::Section { block_id, .. }
            | Self::Divider { block_id }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. } => block_id.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::header(text));
        self
    }

    pub fn section<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: None, text: builder.build() });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::divider());
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks
            .push(Block::Actions { block_id: Some(block_id.into()), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: None, elements: builder.build() });
        self
    }

    pub fn blocks(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::mrkdwn(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Thumbs up/down buttons for the answer as a whole.
pub fn build_qa_feedback_block(query_event_id: i64) -> Block {
    let mut actions = ActionsBuilder::default();
    actions
        .button(ButtonElement::new(LIKE_BLOCK_ACTION_ID, "👍").style(ButtonStyle::Primary))
        .button(ButtonElement::new(DISLIKE_BLOCK_ACTION_ID, "👎").style(ButtonStyle::Danger));

    Block::Actions {
        block_id: build_feedback_block_id(query_event_id, None).ok(),
        elements: actions.build(),
    }
}

/// Endorse/reject buttons for a single reference document.
pub fn build_doc_feedback_block(
    query_event_id: i64,
    document_id: &str,
    document_rank: usize,
) -> Result<Block, BlockIdError> {
    let block_id = build_feedback_block_id(query_event_id, Some((document_id, document_rank)))?;

    let mut actions = ActionsBuilder::default();
    actions
        .button(
            ButtonElement::new(SearchFeedbackType::Endorse.as_str(), "⬆")
                .style(ButtonStyle::Primary)
                .confirm(ConfirmObject::new(
                    "Endorse this Document",
                    "This is a good source of information and should be shown more often!",
                )),
        )
        .button(
            ButtonElement::new(SearchFeedbackType::Reject.as_str(), "⬇")
                .style(ButtonStyle::Danger)
                .confirm(ConfirmObject::new(
                    "Reject this Document",
                    "This is a bad source of information and should be shown less often.",
                )),
        );

    Ok(Block::Actions { block_id: Some(block_id), elements: actions.build() })
}

/// Echoes the question back. Only slash commands need this, since the asker
/// never sees their own input there.
pub fn get_restate_blocks(msg: &str, is_bot_msg: bool) -> Vec<Block> {
    if !is_bot_msg {
        return Vec::new();
    }

    vec![Block::header("Responding to the Query"), Block::section(format!("```{msg}```"))]
}

fn display_name(semantic_identifier: &str, source_type: DocumentSource) -> String {
    if source_type == DocumentSource::Slack {
        format!("#{semantic_identifier}")
    } else {
        semantic_identifier.to_string()
    }
}

pub fn build_documents_blocks(
    documents: &[SearchDoc],
    query_event_id: i64,
    num_docs_to_display: usize,
    include_feedback: bool,
) -> Vec<Block> {
    let mut seen_document_ids = HashSet::new();
    let mut section_blocks = vec![Block::header("Reference Documents")];
    let mut included_docs = 0;

    for (rank, document) in documents.iter().enumerate() {
        if !seen_document_ids.insert(document.document_id.as_str()) {
            continue;
        }

        let doc_sem_id = display_name(&document.semantic_identifier, document.source_type);
        let used_chars = doc_sem_id.chars().count() + 3;
        let match_str = remove_slack_text_interactions(&translate_vespa_highlight_to_slack(
            &document.match_highlights,
            used_chars,
        ));

        included_docs += 1;

        let block_text = match &document.link {
            Some(link) if !link.is_empty() => format!("<{link}|{doc_sem_id}>:\n>{match_str}"),
            _ => format!("{doc_sem_id}:\n>{match_str}"),
        };
        section_blocks.push(Block::section(block_text));

        if include_feedback {
            match build_doc_feedback_block(query_event_id, &document.document_id, rank) {
                Ok(block) => section_blocks.push(block),
                Err(error) => warn!(
                    event_name = "danswerbot.blocks.doc_feedback_skipped",
                    document_id = %document.document_id,
                    error = %error,
                    "skipping document feedback buttons"
                ),
            }
        }

        section_blocks.push(Block::divider());

        if included_docs >= num_docs_to_display {
            break;
        }
    }

    section_blocks
}

pub fn build_quotes_block(quotes: &[DanswerQuote]) -> Vec<Block> {
    // (document id, link, display name, quotes), in first-seen order
    let mut doc_quotes: Vec<(&str, &str, String, Vec<&str>)> = Vec::new();

    for quote in quotes {
        let Some(link) = quote.link.as_deref().filter(|link| !link.is_empty()) else {
            continue;
        };
        if quote.semantic_identifier.is_empty()
            || quote.document_id.is_empty()
            || quote.quote.is_empty()
        {
            continue;
        }

        match doc_quotes.iter_mut().find(|(doc_id, ..)| *doc_id == quote.document_id) {
            Some((_, _, _, texts)) => texts.push(quote.quote.as_str()),
            None => doc_quotes.push((
                quote.document_id.as_str(),
                link,
                display_name(&quote.semantic_identifier, quote.source_type),
                vec![quote.quote.as_str()],
            )),
        }
    }

    if doc_quotes.is_empty() {
        return Vec::new();
    }

    let quote_lines: Vec<String> = doc_quotes
        .into_iter()
        .map(|(_, link, sem_id, texts)| {
            let mut cleaned: Vec<String> = texts
                .into_iter()
                .map(|text| replace_whitespaces_w_space(text).trim().to_string())
                .collect();
            cleaned.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
            cleaned.truncate(MAX_QUOTES_PER_DOCUMENT);

            let single_quote_str =
                cleaned.iter().map(|text| format!("```{text}```")).collect::<Vec<_>>().join("\n");
            format!("<{link}|{sem_id}>:\n{}", remove_slack_text_interactions(&single_quote_str))
        })
        .collect();

    vec![Block::section(format!("*Relevant Snippets*\n{}", quote_lines.join("\n")))]
}

fn filter_description(
    source_filters: Option<&[DocumentSource]>,
    time_cutoff: Option<DateTime<Utc>>,
    favor_recent: bool,
) -> Option<String> {
    let source_filters = source_filters.filter(|sources| !sources.is_empty());
    if source_filters.is_none() && time_cutoff.is_none() && !favor_recent {
        return None;
    }

    let mut filter_text = String::from("Filters: ");
    if let Some(sources) = source_filters {
        let sources_str =
            sources.iter().map(|source| source.as_str()).collect::<Vec<_>>().join(", ");
        filter_text.push_str(&format!("`Sources in [{sources_str}]`"));
        if time_cutoff.is_some() || favor_recent {
            filter_text.push_str(" and ");
        }
    }
    if let Some(cutoff) = time_cutoff {
        filter_text.push_str(&format!("`Docs Updated >= {}` ", cutoff.format("%b %d, %Y")));
    }
    if favor_recent {
        if time_cutoff.is_some() {
            filter_text.push_str("+ ");
        }
        filter_text.push_str("`Prioritize Recently Updated Docs`");
    }

    Some(format!("_{filter_text}_"))
}

pub fn build_qa_response_blocks(
    query_event_id: i64,
    answer: Option<&str>,
    quotes: Option<&[DanswerQuote]>,
    source_filters: Option<&[DocumentSource]>,
    time_cutoff: Option<DateTime<Utc>>,
    favor_recent: bool,
) -> Vec<Block> {
    let mut response_blocks = vec![Block::header("AI Answer")];

    if let Some(filter_text) = filter_description(source_filters, time_cutoff, favor_recent) {
        response_blocks.push(Block::section(filter_text));
    }

    let mut quotes_blocks = Vec::new();
    match answer.filter(|answer| !answer.is_empty()) {
        None => response_blocks.push(Block::section(
            "Sorry, I was unable to find an answer, but I did find some potentially relevant docs 🤓",
        )),
        Some(answer) => {
            response_blocks.push(Block::section(remove_slack_text_interactions(answer)));
            if let Some(quotes) = quotes {
                quotes_blocks = build_quotes_block(quotes);
            }
            if quotes_blocks.is_empty() {
                quotes_blocks.push(Block::section(
                    "*Warning*: no sources were quoted for this answer, so it may be unreliable 😔",
                ));
            }
        }
    }

    response_blocks.push(build_qa_feedback_block(query_event_id));
    response_blocks.extend(quotes_blocks);
    response_blocks.push(Block::divider());
    response_blocks
}

/// Everything DanswerBot posts in reply to a question, as one message.
pub struct DanswerBotResponse<'a> {
    pub query: &'a str,
    pub is_bot_msg: bool,
    pub query_event_id: i64,
    pub answer: Option<&'a str>,
    pub quotes: &'a [DanswerQuote],
    pub documents: &'a [SearchDoc],
    pub source_filters: Option<&'a [DocumentSource]>,
    pub time_cutoff: Option<DateTime<Utc>>,
    pub favor_recent: bool,
}

pub fn build_response_message(
    response: &DanswerBotResponse<'_>,
    num_docs_to_display: usize,
    include_doc_feedback: bool,
) -> MessageTemplate {
    let fallback = response.answer.filter(|answer| !answer.is_empty()).unwrap_or(response.query);

    let mut builder = MessageBuilder::new(remove_slack_text_interactions(fallback))
        .blocks(get_restate_blocks(response.query, response.is_bot_msg))
        .blocks(build_qa_response_blocks(
            response.query_event_id,
            response.answer,
            Some(response.quotes),
            response.source_filters,
            response.time_cutoff,
            response.favor_recent,
        ));

    if !response.documents.is_empty() {
        builder = builder.blocks(build_documents_blocks(
            response.documents,
            response.query_event_id,
            num_docs_to_display,
            include_doc_feedback,
        ));
    }

    builder.build()
}
