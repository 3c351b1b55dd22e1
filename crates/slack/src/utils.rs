//! Text helpers shared by the DanswerBot block builders.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use danswer_core::text::replace_whitespaces_w_space;

/// Joins the parts of a feedback block id. Never allowed inside a document id.
pub const ID_SEPARATOR: &str = ":;:";

const BLOCK_ID_PREFIX_LEN: usize = 10;
const ASCII_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Character budget for a reference document snippet.
const MAX_HIGHLIGHT_CHARS: usize = 300;

static USER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<@(\w+)>").expect("user tag pattern is valid"));
static CHANNEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<#\w+\|([\w-]+)>").expect("channel pattern is valid"));
static ANGLE_BRACKETED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>]*)>").expect("link pattern is valid"));
static SPECIAL_CATCHALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!([^|>]+)\|([^>]+)>").expect("special pattern is valid"));
static GLUED_HIGHLIGHT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\S)<hi>(.*?)</hi>").expect("highlight pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BlockIdError {
    #[error("Invalid document, missing information")]
    MissingDocumentId,
    #[error("Separator pattern should not already exist in document id")]
    SeparatorInDocumentId,
    #[error("Block ID `{0}` is not a DanswerBot feedback block id")]
    Malformed(String),
}

/// Parts recovered from a feedback block id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackBlockId {
    pub query_event_id: i64,
    pub document_id: Option<String>,
    pub document_rank: Option<usize>,
}

/// Builds the id of a feedback actions block. The random prefix keeps ids
/// unique when the same answer is posted more than once in a channel.
pub fn build_feedback_block_id(
    query_event_id: i64,
    document: Option<(&str, usize)>,
) -> Result<String, BlockIdError> {
    let mut rng = rand::thread_rng();
    let unique_prefix: String = (0..BLOCK_ID_PREFIX_LEN)
        .map(|_| ASCII_LETTERS[rng.gen_range(0..ASCII_LETTERS.len())] as char)
        .collect();

    let block_id = match document {
        Some((document_id, _)) if document_id.is_empty() => {
            return Err(BlockIdError::MissingDocumentId)
        }
        Some((document_id, _)) if document_id.contains(ID_SEPARATOR) => {
            return Err(BlockIdError::SeparatorInDocumentId)
        }
        Some((document_id, document_rank)) => {
            [query_event_id.to_string(), document_id.to_string(), document_rank.to_string()]
                .join(ID_SEPARATOR)
        }
        None => query_event_id.to_string(),
    };

    Ok(format!("{unique_prefix}{ID_SEPARATOR}{block_id}"))
}

pub fn decompose_feedback_block_id(block_id: &str) -> Result<FeedbackBlockId, BlockIdError> {
    let malformed = || BlockIdError::Malformed(block_id.to_string());
    let components: Vec<&str> = block_id.split(ID_SEPARATOR).collect();

    match components.as_slice() {
        [_, query_event_id] => Ok(FeedbackBlockId {
            query_event_id: query_event_id.parse().map_err(|_| malformed())?,
            document_id: None,
            document_rank: None,
        }),
        [_, query_event_id, document_id, document_rank] => Ok(FeedbackBlockId {
            query_event_id: query_event_id.parse().map_err(|_| malformed())?,
            document_id: Some((*document_id).to_string()),
            document_rank: Some(document_rank.parse().map_err(|_| malformed())?),
        }),
        _ => Err(malformed()),
    }
}

/// Neutralizes everything in `text` that Slack would turn into a ping or a
/// link when the bot posts it.
pub fn remove_slack_text_interactions(text: &str) -> String {
    let text = USER_TAG_RE.replace_all(text, "@$1");
    let text = CHANNEL_RE.replace_all(&text, "#$1");
    let text = text
        .replace("<!channel>", "@channel")
        .replace("<!here>", "@here")
        .replace("<!everyone>", "@everyone");
    let text = replace_links(&text);
    let text = SPECIAL_CATCHALL_RE.replace_all(&text, "$2");
    text.replace('@', "@\u{200B}")
}

/// `<url|label>` becomes `label` and `<url>` becomes `url`. Mentions and
/// specials (`<@..>`, `<#..>`, `<!..>`) are left for the other passes.
fn replace_links(text: &str) -> String {
    ANGLE_BRACKETED_RE
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let inner = &captures[1];
            match inner.chars().next() {
                None | Some('#') | Some('@') | Some('!') => captures[0].to_string(),
                Some(_) => inner.split('|').nth(1).unwrap_or(inner).to_string(),
            }
        })
        .into_owned()
}

/// Converts search highlights (`<hi>term</hi>`) into Slack bold and joins the
/// snippets, keeping the result within the space left after `used_chars`.
pub fn translate_vespa_highlight_to_slack(match_strs: &[String], used_chars: usize) -> String {
    let final_matches: Vec<String> = match_strs
        .iter()
        .filter(|match_str| !match_str.is_empty())
        .map(|match_str| {
            replace_whitespaces_w_space(&replace_highlight(match_str)).trim().to_string()
        })
        .collect();
    let combined = final_matches.join("... ");

    let remaining = MAX_HIGHLIGHT_CHARS.saturating_sub(used_chars);
    if combined.chars().count() <= remaining {
        return combined;
    }

    if combined.chars().skip(remaining).any(|ch| ch == '*') {
        return combined;
    }
    let mut truncated: String = combined.chars().take(remaining.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Highlights glued to a preceding word are partial-word hits and get
/// unwrapped; the rest become bold.
fn replace_highlight(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = GLUED_HIGHLIGHT_RE.replace_all(&current, "$1$2").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.replace("</hi>", "*").replace("<hi>", "*")
}

#[cfg(test)]
mod tests {
    use super::{
        build_feedback_block_id, decompose_feedback_block_id, remove_slack_text_interactions,
        translate_vespa_highlight_to_slack, BlockIdError, FeedbackBlockId, ID_SEPARATOR,
    };

    #[test]
    fn feedback_block_id_round_trips_with_and_without_document() {
        let plain = build_feedback_block_id(42, None).expect("block id");
        let (prefix, rest) = plain.split_once(ID_SEPARATOR).expect("separator");
        assert_eq!(prefix.len(), 10);
        assert!(prefix.chars().all(|ch| ch.is_ascii_alphabetic()));
        assert_eq!(rest, "42");
        assert_eq!(
            decompose_feedback_block_id(&plain),
            Ok(FeedbackBlockId { query_event_id: 42, document_id: None, document_rank: None })
        );

        let with_doc = build_feedback_block_id(42, Some(("doc-1", 3))).expect("block id");
        assert_eq!(
            decompose_feedback_block_id(&with_doc),
            Ok(FeedbackBlockId {
                query_event_id: 42,
                document_id: Some("doc-1".to_string()),
                document_rank: Some(3),
            })
        );
    }

    #[test]
    fn feedback_block_id_rejects_bad_document_ids() {
        assert_eq!(build_feedback_block_id(1, Some(("", 0))), Err(BlockIdError::MissingDocumentId));
        assert_eq!(
            build_feedback_block_id(1, Some(("a:;:b", 0))),
            Err(BlockIdError::SeparatorInDocumentId)
        );
        assert!(matches!(
            decompose_feedback_block_id("abc:;:1:;:doc"),
            Err(BlockIdError::Malformed(_))
        ));
        assert!(decompose_feedback_block_id("abc:;:not-a-number").is_err());
    }

    #[test]
    fn slack_interactions_are_neutralized() {
        assert_eq!(remove_slack_text_interactions("ping <@U123>"), "ping @\u{200B}U123");
        assert_eq!(remove_slack_text_interactions("see <#C42|eng-help>"), "see #eng-help");
        assert_eq!(remove_slack_text_interactions("<!here> look"), "@\u{200B}here look");
        assert_eq!(
            remove_slack_text_interactions("docs at <https://x.io|the wiki> and <https://y.io>"),
            "docs at the wiki and https://y.io"
        );
        assert_eq!(remove_slack_text_interactions("<!subteam^S1|oncall> help"), "oncall help");
        assert_eq!(remove_slack_text_interactions("mail a@b.com"), "mail a@\u{200B}b.com");
    }

    #[test]
    fn highlights_become_bold_unless_glued_to_a_word() {
        let matches = vec![
            "the <hi>deploy</hi>\nprocess".to_string(),
            String::new(),
            "re<hi>deploy</hi>ment".to_string(),
        ];
        assert_eq!(
            translate_vespa_highlight_to_slack(&matches, 10),
            "the *deploy* process... redeployment"
        );
    }

    #[test]
    fn long_snippets_are_truncated_to_the_remaining_budget() {
        let long = "a".repeat(400);
        let translated = translate_vespa_highlight_to_slack(&[long], 100);
        assert_eq!(translated.chars().count(), 200);
        assert!(translated.ends_with("..."));

        let highlighted_tail = format!("{} <hi>end</hi>", "b".repeat(400));
        let kept = translate_vespa_highlight_to_slack(&[highlighted_tail], 100);
        assert!(kept.ends_with("*end*"), "highlight in the cut-off tail keeps the full text");
    }

    #[test]
    fn highlight_just_before_the_budget_still_truncates() {
        let matches = vec!["abcdef <hi>x</hi>zzzzz".to_string()];
        assert_eq!(translate_vespa_highlight_to_slack(&matches, 290), "abcdef ...");
    }
}
