//! Tag extraction and construction utilities for Nostr events
//!
//! All extraction helpers are total: missing or malformed tags resolve to
//! `None`, empty collections or fallback values, never a panic or an error.

use std::borrow::Cow;

use nostr_sdk::prelude::*;

/// Extract the value of the first tag whose key matches `tag_name`.
///
/// Tag key matching is case-sensitive: `"e"` and `"E"` are different keys
/// (lowercase refers to the immediate parent, uppercase to the thread root).
pub fn extract_tag_str<'a>(event: &'a Event, tag_name: &str) -> Option<&'a str> {
    event
        .tags
        .iter()
        .map(|t| t.as_slice())
        .find(|t| t.first().map(String::as_str) == Some(tag_name))
        .and_then(|t| t.get(1))
        .map(String::as_str)
}

/// Extract all values for a given tag key, in original order.
///
/// Duplicates are preserved; callers may see repeated values when the
/// source event contains them.
pub fn extract_all_tag_values(event: &Event, tag_name: &str) -> Vec<String> {
    event
        .tags
        .iter()
        .map(|t| t.as_slice())
        .filter(|t| t.first().map(String::as_str) == Some(tag_name))
        .filter_map(|t| t.get(1).cloned())
        .collect()
}

/// Extract the first matching tag value and parse it as a decimal integer.
/// Non-numeric values resolve to `None` rather than an error.
pub fn extract_tag_u64(event: &Event, tag_name: &str) -> Option<u64> {
    extract_tag_str(event, tag_name).and_then(|s| s.parse().ok())
}

/// Build a tag with a single-letter key (`e`, `E`, `p`, `a`, ...).
pub fn letter_tag<I, S>(letter: SingleLetterTag, values: I) -> Tag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Tag::custom(TagKind::SingleLetter(letter), values)
}

/// Build a tag with a word key (`title`, `published_at`, `relays`, ...).
pub fn word_tag<I, S>(name: &'static str, values: I) -> Tag
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Tag::custom(TagKind::Custom(Cow::Borrowed(name)), values)
}

/// The addressable-event coordinate `kind:pubkey:d-tag` for an event.
/// A missing d-tag yields an empty identifier segment.
pub fn event_coordinate(event: &Event) -> String {
    let d_tag = extract_tag_str(event, "d").unwrap_or("");
    format!(
        "{}:{}:{}",
        event.kind.as_u16(),
        event.pubkey.to_hex(),
        d_tag
    )
}
