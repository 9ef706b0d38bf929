//! Query-filter construction.
//!
//! Application search parameters translate into relay filters with fields
//! populated only when the corresponding input is present - omission changes
//! filter semantics (no author field means "any author"). Inputs are not
//! validated here; malformed values are the caller's responsibility.

use nostr_sdk::prelude::*;

use crate::constants::{is_addressable, kinds};
use crate::models::bookmark::canonical_d_tag;
use crate::models::tag_utils::event_coordinate;

/// Parameters for bookmark feed and search queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkQuery {
    /// Single author; takes precedence over `authors` when both are set
    pub author: Option<PublicKey>,
    pub authors: Vec<PublicKey>,
    /// Topic (`#t`) filters
    pub hashtags: Vec<String>,
    /// Free-text query for relay-side (NIP-50) search
    pub search: Option<String>,
    /// Pagination boundary: only events created at or before this time
    pub until: Option<u64>,
    pub limit: Option<usize>,
}

impl BookmarkQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new().kind(Kind::Custom(kinds::BOOKMARK));

        if let Some(author) = self.author {
            filter = filter.author(author);
        } else if !self.authors.is_empty() {
            filter = filter.authors(self.authors.iter().copied());
        }
        if !self.hashtags.is_empty() {
            filter = filter.hashtags(self.hashtags.iter().cloned());
        }
        if let Some(search) = &self.search {
            filter = filter.search(search.clone());
        }
        if let Some(until) = self.until {
            filter = filter.until(Timestamp::from(until));
        }
        if let Some(limit) = self.limit {
            filter = filter.limit(limit);
        }

        filter
    }
}

/// Lookup filter for a single bookmark by URL, keyed on the canonical
/// d-tag.
pub fn bookmark_by_url_filter(url: &str, author: Option<PublicKey>) -> Filter {
    let mut filter = Filter::new()
        .kind(Kind::Custom(kinds::BOOKMARK))
        .identifier(canonical_d_tag(url))
        .limit(1);
    if let Some(author) = author {
        filter = filter.author(author);
    }
    filter
}

/// Filters for comments on a root event: uppercase `E` reference, plus an
/// uppercase `A` coordinate reference when the root is addressable.
pub fn comment_filters(root: &Event, limit: usize) -> Vec<Filter> {
    let mut filters = vec![Filter::new()
        .kind(Kind::Custom(kinds::COMMENT))
        .custom_tag(SingleLetterTag::uppercase(Alphabet::E), root.id.to_hex())
        .limit(limit)];

    if is_addressable(root.kind.as_u16()) {
        filters.push(
            Filter::new()
                .kind(Kind::Custom(kinds::COMMENT))
                .custom_tag(SingleLetterTag::uppercase(Alphabet::A), event_coordinate(root))
                .limit(limit),
        );
    }

    filters
}

/// Filters for reactions to a target event: lowercase `e` reference, plus a
/// lowercase `a` coordinate reference when the target is addressable.
pub fn reaction_filters(target: &Event, limit: usize) -> Vec<Filter> {
    let mut filters = vec![Filter::new()
        .kind(Kind::Custom(kinds::REACTION))
        .event(target.id)
        .limit(limit)];

    if is_addressable(target.kind.as_u16()) {
        filters.push(
            Filter::new()
                .kind(Kind::Custom(kinds::REACTION))
                .custom_tag(
                    SingleLetterTag::lowercase(Alphabet::A),
                    event_coordinate(target),
                )
                .limit(limit),
        );
    }

    filters
}

/// Filter for zap receipts referencing an event.
pub fn zap_receipt_filter(event_id: EventId, limit: usize) -> Filter {
    Filter::new()
        .kind(Kind::Custom(kinds::ZAP_RECEIPT))
        .event(event_id)
        .limit(limit)
}

/// Filter for the latest profile metadata of a user.
pub fn metadata_filter(author: PublicKey) -> Filter {
    Filter::new()
        .kind(Kind::Custom(kinds::METADATA))
        .author(author)
        .limit(1)
}

/// Filter for the latest contact list of a user.
pub fn contacts_filter(author: PublicKey) -> Filter {
    Filter::new()
        .kind(Kind::Custom(kinds::CONTACTS))
        .author(author)
        .limit(1)
}
