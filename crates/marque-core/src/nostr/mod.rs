pub mod client;
pub mod publish;
pub mod queries;

pub use client::{query_many, QueryOptions, RelayClient, RelayPublish, RelayQuery};
pub use publish::{
    build_zap_request, delete_event, delete_reaction, publish_bookmark, publish_comment,
    publish_reaction, ZapRequest,
};
pub use queries::{
    fetch_bookmark, fetch_bookmark_event, fetch_bookmark_page, fetch_bookmarks, fetch_comments,
    fetch_follows, fetch_lightning_address, fetch_reaction_stats, fetch_reactions,
    fetch_zap_receipts, fetch_zap_stats, search_bookmarks, BookmarkPage,
};
