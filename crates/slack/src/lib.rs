//! DanswerBot presentation layer for Slack.
//!
//! - **Block Kit** (`blocks`) - typed blocks plus the builders for answers,
//!   quotes, reference documents and feedback buttons
//! - **Utils** (`utils`) - feedback block ids, Slack markup scrubbing and
//!   search highlight translation
//! - **Filters** (`filters`) - per-channel rules for when to answer and when
//!   to post
//! - **Tokens** (`tokens`) - app/bot token storage
//!
//! # Response layout
//!
//! ```text
//! restate (slash commands) → AI Answer → feedback → quotes → Reference Documents
//! ```

pub mod blocks;
pub mod filters;
pub mod tokens;
pub mod utils;
