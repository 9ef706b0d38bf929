pub mod bookmark;
pub mod comment;
pub mod reaction;
pub mod tag_utils;
pub mod zap;

pub use bookmark::{format_bookmark_count, Bookmark, BookmarkDraft};
pub use comment::{build_comment_tree, count_comments, Comment, CommentCounts};
pub use reaction::{Reaction, ReactionStats};
pub use zap::{decode_invoice_amount_sats, ZapStats};
