//! Threaded comments (NIP-22 kind:1111).
//!
//! Uppercase tags (`E`, `A`, `K`, `P`) always reference the thread root;
//! lowercase tags (`e`, `a`, `k`, `p`) always reference the immediate
//! parent. The casing convention is protocol-level and preserved exactly.

use std::collections::{HashMap, HashSet};

use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use super::tag_utils::{event_coordinate, extract_tag_str, extract_tag_u64, letter_tag};
use crate::constants::{is_addressable, kinds};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Event id (hex-encoded)
    pub id: String,
    pub content: String,
    pub created_at: u64,
    /// Author pubkey (hex-encoded)
    pub author: String,
    /// Immediate parent comment id; `None` for top-level comments
    pub parent_id: Option<String>,
    /// Thread root event id
    pub root_id: String,
    /// Kind of the thread root event
    pub root_kind: u16,
    /// Thread root author pubkey (hex-encoded)
    pub root_author: String,
    /// Direct replies, oldest first once the tree is assembled
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Parse a comment from a kind:1111 event. Root references missing from
    /// the tags fall back to the supplied root event; a lowercase `e` tag
    /// pointing at the root itself collapses to "no parent".
    pub fn from_event(event: &Event, root: &Event) -> Option<Self> {
        if event.kind.as_u16() != kinds::COMMENT {
            return None;
        }

        let root_id_hex = root.id.to_hex();
        let parent_id = extract_tag_str(event, "e")
            .filter(|id| *id != root_id_hex)
            .map(String::from);

        Some(Comment {
            id: event.id.to_hex(),
            content: event.content.clone(),
            created_at: event.created_at.as_u64(),
            author: event.pubkey.to_hex(),
            parent_id,
            root_id: extract_tag_str(event, "E")
                .map(String::from)
                .unwrap_or(root_id_hex),
            root_kind: extract_tag_u64(event, "K")
                .and_then(|k| u16::try_from(k).ok())
                .unwrap_or(root.kind.as_u16()),
            root_author: extract_tag_str(event, "P")
                .map(String::from)
                .unwrap_or_else(|| root.pubkey.to_hex()),
            replies: Vec::new(),
        })
    }
}

/// Reassemble a flat comment list into a reply forest.
///
/// A comment whose parent id resolves to another comment in the set becomes
/// its child; anything else (no parent, or a parent outside the observed
/// set) is top-level. Every sibling list, including the top level, is
/// sorted ascending by creation time for natural reading order.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<Comment> {
    let ids: HashSet<String> = comments.iter().map(|c| c.id.clone()).collect();

    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut top_level: Vec<Comment> = Vec::new();

    for comment in comments {
        match comment.parent_id.clone() {
            Some(parent) if parent != comment.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            _ => top_level.push(comment),
        }
    }

    fn attach(node: &mut Comment, children: &mut HashMap<String, Vec<Comment>>) {
        if let Some(mut replies) = children.remove(&node.id) {
            for reply in &mut replies {
                attach(reply, children);
            }
            replies.sort_by_key(|c| c.created_at);
            node.replies = replies;
        }
    }

    for comment in &mut top_level {
        attach(comment, &mut children);
    }
    top_level.sort_by_key(|c| c.created_at);
    top_level
}

/// Comment totals across a reply forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentCounts {
    pub total: usize,
    /// Comments written by the queried user, when one was supplied
    pub by_user: usize,
}

pub fn count_comments(comments: &[Comment], user: Option<&str>) -> CommentCounts {
    let mut counts = CommentCounts::default();
    for comment in comments {
        counts.total += 1;
        if user.is_some_and(|u| u == comment.author) {
            counts.by_user += 1;
        }
        let child = count_comments(&comment.replies, user);
        counts.total += child.total;
        counts.by_user += child.by_user;
    }
    counts
}

/// Build the tag array for a new comment on `root`, optionally replying to
/// an existing comment.
///
/// Addressable roots get an `A` coordinate reference instead of `E`;
/// omitting the coordinate for addressable targets would break thread
/// discovery for those records.
pub fn comment_tags(root: &Event, parent: Option<&Comment>) -> Vec<Tag> {
    let root_kind = root.kind.as_u16();
    let root_author = root.pubkey.to_hex();
    let root_id = root.id.to_hex();
    let mut tags = Vec::new();

    // Root references (uppercase)
    if is_addressable(root_kind) {
        tags.push(letter_tag(
            SingleLetterTag::uppercase(Alphabet::A),
            [event_coordinate(root), String::new(), root_author.clone()],
        ));
    } else {
        tags.push(letter_tag(
            SingleLetterTag::uppercase(Alphabet::E),
            [root_id.clone(), String::new(), root_author.clone()],
        ));
    }
    tags.push(letter_tag(
        SingleLetterTag::uppercase(Alphabet::K),
        [root_kind.to_string()],
    ));
    tags.push(letter_tag(
        SingleLetterTag::uppercase(Alphabet::P),
        [root_author.clone(), String::new()],
    ));

    // Parent references (lowercase)
    match parent {
        Some(parent) => {
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::E),
                [parent.id.clone(), String::new(), parent.author.clone()],
            ));
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::K),
                [kinds::COMMENT.to_string()],
            ));
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::P),
                [parent.author.clone(), String::new()],
            ));
        }
        None => {
            // Top-level comment: the parent is the root event itself
            if is_addressable(root_kind) {
                tags.push(letter_tag(
                    SingleLetterTag::lowercase(Alphabet::A),
                    [event_coordinate(root), String::new(), root_author.clone()],
                ));
            }
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::E),
                [root_id, String::new(), root_author.clone()],
            ));
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::K),
                [root_kind.to_string()],
            ));
            tags.push(letter_tag(
                SingleLetterTag::lowercase(Alphabet::P),
                [root_author, String::new()],
            ));
        }
    }

    tags
}
