//! Web bookmark records - addressable kind:39701 events keyed by a
//! canonicalized URL d-tag.

use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use super::tag_utils::{extract_all_tag_values, extract_tag_str, extract_tag_u64, letter_tag, word_tag};
use crate::constants::kinds;

/// An immutable snapshot of one bookmark event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Event id (hex-encoded)
    pub id: String,
    /// URL reconstructed from the d-tag
    pub url: String,
    pub title: Option<String>,
    /// Event content
    pub description: String,
    /// Topic tags, in original order, duplicates preserved
    pub tags: Vec<String>,
    /// Author-supplied publication time, absent when the tag is missing
    /// or not numeric
    pub published_at: Option<u64>,
    pub created_at: u64,
    /// Author pubkey (hex-encoded)
    pub author: String,
}

impl Bookmark {
    /// Parse a bookmark from a kind:39701 event.
    /// Returns `None` for any other kind.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind.as_u16() != kinds::BOOKMARK {
            return None;
        }

        let d_tag = extract_tag_str(event, "d").unwrap_or("");

        Some(Bookmark {
            id: event.id.to_hex(),
            url: url_from_d_tag(d_tag),
            title: extract_tag_str(event, "title").map(String::from),
            description: event.content.clone(),
            tags: extract_all_tag_values(event, "t"),
            published_at: extract_tag_u64(event, "published_at"),
            created_at: event.created_at.as_u64(),
            author: event.pubkey.to_hex(),
        })
    }
}

/// Canonicalize a URL into its d-tag form: scheme stripped, query string
/// and fragment stripped, trailing slash stripped.
pub fn canonical_d_tag(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let stripped = stripped
        .split_once(&['?', '#'][..])
        .map_or(stripped, |(before, _)| before);
    stripped.trim_end_matches('/').to_string()
}

/// Reconstruct a URL from a d-tag, defaulting to `https://` when no scheme
/// is present. The transform is lossy: an original `http://` scheme
/// degrades permanently to `https://`.
pub fn url_from_d_tag(d_tag: &str) -> String {
    if d_tag.is_empty() || d_tag.starts_with("http://") || d_tag.starts_with("https://") {
        d_tag.to_string()
    } else {
        format!("https://{d_tag}")
    }
}

/// Input for publishing a new bookmark event.
#[derive(Debug, Clone, Default)]
pub struct BookmarkDraft {
    pub url: String,
    pub title: Option<String>,
    pub description: String,
    pub topics: Vec<String>,
}

impl BookmarkDraft {
    /// Build the tag array for the bookmark event: `d`, `title?`,
    /// `published_at`, then one `t` per non-empty trimmed topic,
    /// lower-cased.
    pub fn to_tags(&self) -> Vec<Tag> {
        let mut tags = vec![letter_tag(
            SingleLetterTag::lowercase(Alphabet::D),
            [canonical_d_tag(&self.url)],
        )];

        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            tags.push(word_tag("title", [title]));
        }

        tags.push(word_tag(
            "published_at",
            [Timestamp::now().as_u64().to_string()],
        ));

        for topic in &self.topics {
            let topic = topic.trim();
            if !topic.is_empty() {
                tags.push(word_tag("t", [topic.to_lowercase()]));
            }
        }

        tags
    }
}

/// Format a bookmark count for display: counts above 20, or any count on a
/// truncated page, show as `+N`.
pub fn format_bookmark_count(count: usize, has_more: bool) -> String {
    if count > 20 || has_more {
        format!("+{count}")
    } else {
        count.to_string()
    }
}
