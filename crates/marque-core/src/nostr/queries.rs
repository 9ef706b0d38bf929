//! Read operations: relay queries mapped into domain records.
//!
//! Every function takes the read capability explicitly; nothing here holds
//! state, so each call produces a fresh immutable snapshot.

use anyhow::Result;
use nostr_sdk::prelude::*;
use tracing::{debug, warn};

use super::client::{query_many, QueryOptions, RelayQuery};
use crate::constants::{DEFAULT_QUERY_LIMIT, DEFAULT_SEARCH_LIMIT, SEARCH_WIDEN_CAP};
use crate::error::Error;
use crate::filters::{
    bookmark_by_url_filter, comment_filters, contacts_filter, metadata_filter, reaction_filters,
    zap_receipt_filter, BookmarkQuery,
};
use crate::lnurl::lightning_address_from_metadata;
use crate::models::comment::build_comment_tree;
use crate::models::tag_utils::extract_all_tag_values;
use crate::models::{Bookmark, Comment, Reaction, ReactionStats, ZapStats};
use crate::search::bookmark_matches;

fn to_bookmarks_newest_first(events: Vec<Event>) -> Vec<Bookmark> {
    let mut bookmarks: Vec<Bookmark> = events.iter().filter_map(Bookmark::from_event).collect();
    bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookmarks
}

/// Fetch a bookmark feed, newest first.
pub async fn fetch_bookmarks<C: RelayQuery>(
    client: &C,
    query: &BookmarkQuery,
    opts: &QueryOptions,
) -> Result<Vec<Bookmark>> {
    let mut query = query.clone();
    query.limit = Some(query.limit.unwrap_or(DEFAULT_QUERY_LIMIT));
    let events = client.query(query.to_filter(), opts).await?;
    Ok(to_bookmarks_newest_first(events))
}

/// Look up the raw event backing a bookmark, needed as the root reference
/// for comment and reaction operations.
pub async fn fetch_bookmark_event<C: RelayQuery>(
    client: &C,
    url: &str,
    author: Option<PublicKey>,
    opts: &QueryOptions,
) -> Result<Option<Event>> {
    let events = client.query(bookmark_by_url_filter(url, author), opts).await?;
    Ok(events.into_iter().next())
}

/// Look up a single bookmark by URL (and optionally author). Callers
/// should use the short lookup timeout for this one.
pub async fn fetch_bookmark<C: RelayQuery>(
    client: &C,
    url: &str,
    author: Option<PublicKey>,
    opts: &QueryOptions,
) -> Result<Option<Bookmark>> {
    let event = fetch_bookmark_event(client, url, author, opts).await?;
    Ok(event.as_ref().and_then(Bookmark::from_event))
}

/// One page of a paginated bookmark feed.
#[derive(Debug, Clone)]
pub struct BookmarkPage {
    pub bookmarks: Vec<Bookmark>,
    /// Pass as `until` for the next page; absent once the feed is exhausted
    pub next_cursor: Option<u64>,
}

/// Fetch one feed page. The cursor is the `created_at` of the oldest entry
/// of a full page.
pub async fn fetch_bookmark_page<C: RelayQuery>(
    client: &C,
    query: &BookmarkQuery,
    page_size: usize,
    until: Option<u64>,
    opts: &QueryOptions,
) -> Result<BookmarkPage> {
    let mut query = query.clone();
    query.limit = Some(page_size);
    if until.is_some() {
        query.until = until;
    }

    let events = client.query(query.to_filter(), opts).await?;
    let bookmarks = to_bookmarks_newest_first(events);
    let next_cursor = (bookmarks.len() == page_size)
        .then(|| bookmarks.last().map(|b| b.created_at))
        .flatten();

    Ok(BookmarkPage {
        bookmarks,
        next_cursor,
    })
}

/// Fetch the comment thread for a root event, assembled into a reply
/// forest ordered oldest-first at every level.
pub async fn fetch_comments<C: RelayQuery>(
    client: &C,
    root: &Event,
    opts: &QueryOptions,
) -> Result<Vec<Comment>> {
    let events = query_many(client, comment_filters(root, DEFAULT_QUERY_LIMIT), opts).await?;
    let comments: Vec<Comment> = events
        .iter()
        .filter_map(|e| Comment::from_event(e, root))
        .collect();
    Ok(build_comment_tree(comments))
}

/// Fetch reactions to a target event, newest first.
pub async fn fetch_reactions<C: RelayQuery>(
    client: &C,
    target: &Event,
    opts: &QueryOptions,
) -> Result<Vec<Reaction>> {
    let events = query_many(client, reaction_filters(target, DEFAULT_QUERY_LIMIT), opts).await?;
    let mut reactions: Vec<Reaction> = events.iter().filter_map(Reaction::from_event).collect();
    reactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(reactions)
}

/// Fetch reactions and fold them into per-target tallies.
pub async fn fetch_reaction_stats<C: RelayQuery>(
    client: &C,
    target: &Event,
    user: Option<&str>,
    opts: &QueryOptions,
) -> Result<ReactionStats> {
    let reactions = fetch_reactions(client, target, opts).await?;
    Ok(ReactionStats::from_reactions(&reactions, user))
}

/// Fetch raw zap receipt events referencing an event id.
pub async fn fetch_zap_receipts<C: RelayQuery>(
    client: &C,
    event_id: EventId,
    opts: &QueryOptions,
) -> Result<Vec<Event>> {
    client
        .query(zap_receipt_filter(event_id, DEFAULT_QUERY_LIMIT), opts)
        .await
}

/// Fetch zap receipts and fold them into count and satoshi totals.
pub async fn fetch_zap_stats<C: RelayQuery>(
    client: &C,
    event_id: EventId,
    opts: &QueryOptions,
) -> Result<ZapStats> {
    let receipts = fetch_zap_receipts(client, event_id, opts).await?;
    Ok(ZapStats::from_receipts(&receipts))
}

/// Fetch the pubkeys followed by a user, from their latest contact list.
pub async fn fetch_follows<C: RelayQuery>(
    client: &C,
    author: PublicKey,
    opts: &QueryOptions,
) -> Result<Vec<String>> {
    let events = client.query(contacts_filter(author), opts).await?;
    Ok(events
        .first()
        .map(|event| {
            extract_all_tag_values(event, "p")
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default())
}

/// Resolve a user's lightning address (`lud16`, falling back to a decodable
/// `lud06`) from their latest profile metadata. Fails with
/// `Error::MissingLightningAddress` when the profile is absent or carries
/// neither field.
pub async fn fetch_lightning_address<C: RelayQuery>(
    client: &C,
    author: PublicKey,
    opts: &QueryOptions,
) -> Result<String> {
    let events = client.query(metadata_filter(author), opts).await?;
    let event = events.first().ok_or(Error::MissingLightningAddress)?;
    let metadata: serde_json::Value =
        serde_json::from_str(&event.content).unwrap_or(serde_json::Value::Null);
    Ok(lightning_address_from_metadata(&metadata).ok_or(Error::MissingLightningAddress)?)
}

/// Search bookmarks with graceful degradation.
///
/// A relay-side (NIP-50) search is attempted first. When that call fails or
/// returns nothing, the query is re-issued without the `search` field,
/// widened to `min(limit * 5, 500)` results, and narrowed locally with a
/// case-insensitive substring match over title, description, URL and tags.
///
/// A relay that legitimately has zero matches is indistinguishable from one
/// that ignores the `search` field, so the widened fetch can be redundant;
/// that is accepted behavior. Cancellation is never swallowed into the
/// fallback path.
pub async fn search_bookmarks<C: RelayQuery>(
    client: &C,
    query: &BookmarkQuery,
    opts: &QueryOptions,
) -> Result<Vec<Bookmark>> {
    let term = match query.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => term.to_string(),
        _ => return Ok(Vec::new()),
    };
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let mut relay_search = query.clone();
    relay_search.search = Some(term.clone());
    relay_search.limit = Some(limit);

    match client.query(relay_search.to_filter(), opts).await {
        Ok(events) if !events.is_empty() => return Ok(to_bookmarks_newest_first(events)),
        Ok(_) => debug!("relay search returned no results, using client-side fallback"),
        Err(err) if Error::is_cancelled(&err) => return Err(err),
        Err(err) => warn!(%err, "relay search failed, using client-side fallback"),
    }

    let mut widened = query.clone();
    widened.search = None;
    widened.limit = Some((limit * 5).min(SEARCH_WIDEN_CAP));

    let events = client.query(widened.to_filter(), opts).await?;
    let term_lower = term.to_lowercase();
    let mut bookmarks: Vec<Bookmark> = events
        .iter()
        .filter_map(Bookmark::from_event)
        .filter(|b| bookmark_matches(b, &term_lower))
        .collect();
    bookmarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookmarks.truncate(limit);
    Ok(bookmarks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::kinds;
    use crate::models::tag_utils::word_tag;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted read capability: pops one canned response per query and
    /// records the filters it was asked for.
    struct FakeRelay {
        responses: Mutex<VecDeque<Result<Vec<Event>>>>,
        calls: Mutex<Vec<Filter>>,
    }

    impl FakeRelay {
        fn new(responses: Vec<Result<Vec<Event>>>) -> Self {
            FakeRelay {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Filter> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RelayQuery for FakeRelay {
        async fn query(&self, filter: Filter, _opts: &QueryOptions) -> Result<Vec<Event>> {
            self.calls.lock().unwrap().push(filter);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra query")
        }
    }

    fn bookmark_event(d_tag: &str, title: &str, created_at: u64) -> Event {
        let keys = Keys::generate();
        EventBuilder::new(Kind::Custom(kinds::BOOKMARK), "description")
            .tags(vec![word_tag("d", [d_tag]), word_tag("title", [title])])
            .custom_created_at(Timestamp::from(created_at))
            .sign_with_keys(&keys)
            .unwrap()
    }

    fn search_query(term: &str, limit: usize) -> BookmarkQuery {
        BookmarkQuery {
            search: Some(term.to_string()),
            limit: Some(limit),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_returns_relay_results_when_supported() {
        let relay = FakeRelay::new(vec![Ok(vec![
            bookmark_event("example.com/old", "Rust intro", 10),
            bookmark_event("example.com/new", "Rust news", 20),
        ])]);

        let results = search_bookmarks(&relay, &search_query("rust", 50), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(relay.calls().len(), 1, "no fallback fetch");
        assert_eq!(results.len(), 2);
        // Newest first
        assert_eq!(results[0].url, "https://example.com/new");
    }

    #[tokio::test]
    async fn test_search_empty_relay_result_triggers_one_widened_fetch() {
        let relay = FakeRelay::new(vec![
            Ok(Vec::new()),
            Ok(vec![
                bookmark_event("example.com/a", "All about RUST", 10),
                bookmark_event("example.com/b", "Gardening", 20),
            ]),
        ]);

        let query = search_query("rust", 50);
        let results = search_bookmarks(&relay, &query, &QueryOptions::default())
            .await
            .unwrap();

        let calls = relay.calls();
        assert_eq!(calls.len(), 2, "exactly one additional widened fetch");

        let mut widened = query.clone();
        widened.search = None;
        widened.limit = Some(250);
        assert_eq!(calls[1], widened.to_filter());

        // Case-insensitive substring match narrowed the widened fetch
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title.as_deref(), Some("All about RUST"));
    }

    #[tokio::test]
    async fn test_search_widen_is_capped() {
        let relay = FakeRelay::new(vec![Ok(Vec::new()), Ok(Vec::new())]);
        let query = search_query("rust", 200);
        search_bookmarks(&relay, &query, &QueryOptions::default())
            .await
            .unwrap();

        let mut widened = query.clone();
        widened.search = None;
        widened.limit = Some(SEARCH_WIDEN_CAP);
        assert_eq!(relay.calls()[1], widened.to_filter());
    }

    #[tokio::test]
    async fn test_search_relay_error_falls_back() {
        let relay = FakeRelay::new(vec![
            Err(anyhow::anyhow!("relay rejected search")),
            Ok(vec![bookmark_event("example.com/a", "Rust", 10)]),
        ]);

        let results = search_bookmarks(&relay, &search_query("rust", 50), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_cancellation_is_not_swallowed() {
        let relay = FakeRelay::new(vec![Err(Error::Cancelled.into())]);

        let err = search_bookmarks(&relay, &search_query("rust", 50), &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(Error::is_cancelled(&err));
        assert_eq!(relay.calls().len(), 1, "no fallback after cancellation");
    }

    #[tokio::test]
    async fn test_search_fallback_truncates_to_requested_limit() {
        let matches: Vec<Event> = (0..5)
            .map(|i| bookmark_event(&format!("example.com/{i}"), "rust", i))
            .collect();
        let relay = FakeRelay::new(vec![Ok(Vec::new()), Ok(matches)]);

        let results = search_bookmarks(&relay, &search_query("rust", 3), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].created_at, 4);
    }

    #[tokio::test]
    async fn test_search_blank_query_short_circuits() {
        let relay = FakeRelay::new(vec![]);
        let results = search_bookmarks(&relay, &search_query("  ", 50), &QueryOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_bookmark_page_cursor() {
        let relay = FakeRelay::new(vec![Ok(vec![
            bookmark_event("example.com/1", "one", 30),
            bookmark_event("example.com/2", "two", 20),
        ])]);

        let page = fetch_bookmark_page(
            &relay,
            &BookmarkQuery::default(),
            2,
            None,
            &QueryOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(page.next_cursor, Some(20), "cursor is the oldest entry");
    }

    #[tokio::test]
    async fn test_fetch_bookmark_page_partial_page_has_no_cursor() {
        let relay = FakeRelay::new(vec![Ok(vec![bookmark_event("example.com/1", "one", 30)])]);

        let page = fetch_bookmark_page(
            &relay,
            &BookmarkQuery::default(),
            2,
            Some(100),
            &QueryOptions::default(),
        )
        .await
        .unwrap();

        assert!(page.next_cursor.is_none());
        assert_eq!(relay.calls()[0], {
            BookmarkQuery {
                until: Some(100),
                limit: Some(2),
                ..Default::default()
            }
            .to_filter()
        });
    }

    fn metadata_event(content: &serde_json::Value) -> Event {
        let keys = Keys::generate();
        EventBuilder::new(Kind::Custom(kinds::METADATA), content.to_string())
            .sign_with_keys(&keys)
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_lightning_address_from_lud16() {
        let event = metadata_event(&serde_json::json!({ "lud16": "alice@example.com" }));
        let relay = FakeRelay::new(vec![Ok(vec![event])]);

        let address =
            fetch_lightning_address(&relay, Keys::generate().public_key(), &QueryOptions::default())
                .await
                .unwrap();
        assert_eq!(address, "alice@example.com");
    }

    #[tokio::test]
    async fn test_fetch_lightning_address_missing_profile() {
        let relay = FakeRelay::new(vec![Ok(Vec::new())]);

        let err =
            fetch_lightning_address(&relay, Keys::generate().public_key(), &QueryOptions::default())
                .await
                .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingLightningAddress)
        ));
    }

    #[tokio::test]
    async fn test_fetch_follows_skips_empty_entries() {
        let keys = Keys::generate();
        let contact_event = EventBuilder::new(Kind::Custom(kinds::CONTACTS), "")
            .tags(vec![
                word_tag("p", ["a".repeat(64)]),
                word_tag("p", [""]),
                word_tag("p", ["b".repeat(64)]),
            ])
            .sign_with_keys(&keys)
            .unwrap();
        let relay = FakeRelay::new(vec![Ok(vec![contact_event])]);

        let follows = fetch_follows(&relay, keys.public_key(), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(follows, vec!["a".repeat(64), "b".repeat(64)]);
    }
}
