//! Application-wide constants
//!
//! Relay defaults, query limits and timeouts, and the Nostr event kinds
//! used across modules.

use std::time::Duration;

/// Default relays used when the caller does not supply any.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

/// Default limit for feed-style bookmark queries.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Default page size for paginated bookmark fetches.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default limit for search queries.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Hard cap on the widened fetch issued by the client-side search fallback.
pub const SEARCH_WIDEN_CAP: usize = 500;

/// Timeout for small lookups (single bookmark, contact list).
pub const SHORT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for feed, comment, reaction and zap-receipt fetches.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for sending a signed event to relays.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

// Nostr event kinds used by marque
pub mod kinds {
    /// Profile metadata
    pub const METADATA: u16 = 0;
    /// Contact list (follows)
    pub const CONTACTS: u16 = 3;
    /// Event deletion request
    pub const DELETION: u16 = 5;
    /// Reaction
    pub const REACTION: u16 = 7;
    /// Comment (NIP-22)
    pub const COMMENT: u16 = 1111;
    /// Zap request (NIP-57)
    pub const ZAP_REQUEST: u16 = 9734;
    /// Zap receipt (NIP-57)
    pub const ZAP_RECEIPT: u16 = 9735;
    /// Web bookmark (addressable, keyed by canonicalized URL d-tag)
    pub const BOOKMARK: u16 = 39701;
}

/// Addressable events are identified by `(kind, author, d-tag)` rather than
/// by event id alone.
pub fn is_addressable(kind: u16) -> bool {
    (30000..40000).contains(&kind)
}
