//! Client-side substring matching for the search fallback path.
//!
//! Used when a relay does not support server-side (NIP-50) search: a wider
//! unfiltered fetch is narrowed locally with these predicates.

use crate::models::Bookmark;

/// Case-insensitive substring check.
pub fn text_contains(text: &str, term_lower: &str) -> bool {
    text.to_lowercase().contains(term_lower)
}

/// True when the query matches the bookmark's title, description, URL or
/// any topic tag, case-insensitively. `term_lower` must already be
/// lower-cased by the caller (it is applied against many bookmarks).
pub fn bookmark_matches(bookmark: &Bookmark, term_lower: &str) -> bool {
    bookmark
        .title
        .as_deref()
        .is_some_and(|t| text_contains(t, term_lower))
        || text_contains(&bookmark.description, term_lower)
        || text_contains(&bookmark.url, term_lower)
        || bookmark.tags.iter().any(|t| text_contains(t, term_lower))
}
