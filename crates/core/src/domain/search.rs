use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    IngestionApi,
    Slack,
    Web,
    GoogleDrive,
    Github,
    Gitlab,
    Guru,
    Bookstack,
    Confluence,
    Jira,
    Productboard,
    File,
    Notion,
    Zulip,
    Linear,
    Hubspot,
    Gong,
    GoogleSites,
    Zendesk,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IngestionApi => "ingestion_api",
            Self::Slack => "slack",
            Self::Web => "web",
            Self::GoogleDrive => "google_drive",
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Guru => "guru",
            Self::Bookstack => "bookstack",
            Self::Confluence => "confluence",
            Self::Jira => "jira",
            Self::Productboard => "productboard",
            Self::File => "file",
            Self::Notion => "notion",
            Self::Zulip => "zulip",
            Self::Linear => "linear",
            Self::Hubspot => "hubspot",
            Self::Gong => "gong",
            Self::GoogleSites => "google_sites",
            Self::Zendesk => "zendesk",
        }
    }
}

/// Admin/user feedback on a single retrieved document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFeedbackType {
    Endorse,
    Reject,
    Hide,
    Unhide,
}

impl SearchFeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endorse => "endorse",
            Self::Reject => "reject",
            Self::Hide => "hide",
            Self::Unhide => "unhide",
        }
    }
}

/// A retrieved document as handed to presentation code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchDoc {
    pub document_id: String,
    pub semantic_identifier: String,
    pub link: Option<String>,
    pub blurb: String,
    pub source_type: DocumentSource,
    /// Snippets with matched terms wrapped in `<hi>...</hi>`.
    #[serde(default)]
    pub match_highlights: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// A snippet the LLM cited in support of its answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanswerQuote {
    pub quote: String,
    pub document_id: String,
    pub link: Option<String>,
    pub source_type: DocumentSource,
    pub semantic_identifier: String,
    #[serde(default)]
    pub blurb: String,
}
