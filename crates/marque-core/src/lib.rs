pub mod constants;
pub mod error;
pub mod filters;
pub mod lnurl;
pub mod models;
pub mod nostr;
pub mod search;

pub use error::Error;
pub use filters::BookmarkQuery;
pub use models::{
    Bookmark, BookmarkDraft, Comment, CommentCounts, Reaction, ReactionStats, ZapStats,
};
pub use nostr::{QueryOptions, RelayClient, RelayQuery};
