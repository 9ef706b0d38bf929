//! Reactions (kind:7) and their per-target aggregation.

use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};

use super::tag_utils::{event_coordinate, letter_tag};
use crate::constants::{is_addressable, kinds};

/// A single reaction event. Content is `+`, `-`, the empty string, or an
/// emoji.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Event id (hex-encoded)
    pub id: String,
    pub content: String,
    pub created_at: u64,
    /// Author pubkey (hex-encoded)
    pub author: String,
}

impl Reaction {
    /// Parse a reaction from a kind:7 event. Returns `None` for any other
    /// kind.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind.as_u16() != kinds::REACTION {
            return None;
        }
        Some(Reaction {
            id: event.id.to_hex(),
            content: event.content.clone(),
            created_at: event.created_at.as_u64(),
            author: event.pubkey.to_hex(),
        })
    }

    pub fn is_like(&self) -> bool {
        self.content == "+" || self.content.is_empty()
    }

    pub fn is_dislike(&self) -> bool {
        self.content == "-"
    }
}

/// Aggregated reaction tallies for one target event.
///
/// Emoji reactions count toward `total` but not toward likes or dislikes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReactionStats {
    pub total: usize,
    pub likes: usize,
    pub dislikes: usize,
    /// The queried user's own reaction, kept for toggle handling
    pub user_reaction: Option<Reaction>,
}

impl ReactionStats {
    pub fn from_reactions(reactions: &[Reaction], user: Option<&str>) -> Self {
        let mut stats = ReactionStats {
            total: reactions.len(),
            ..Default::default()
        };

        for reaction in reactions {
            if user.is_some_and(|u| u == reaction.author) {
                stats.user_reaction = Some(reaction.clone());
            }
            if reaction.is_like() {
                stats.likes += 1;
            } else if reaction.is_dislike() {
                stats.dislikes += 1;
            }
        }

        stats
    }

    pub fn user_liked(&self) -> bool {
        self.user_reaction.as_ref().is_some_and(Reaction::is_like)
    }

    pub fn user_disliked(&self) -> bool {
        self.user_reaction.as_ref().is_some_and(Reaction::is_dislike)
    }
}

/// Build the tag array for a reaction to `target`: `e`, `p`, `k`, plus an
/// `a` coordinate tag when the target is addressable.
pub fn reaction_tags(target: &Event) -> Vec<Tag> {
    let author = target.pubkey.to_hex();
    let mut tags = vec![
        letter_tag(
            SingleLetterTag::lowercase(Alphabet::E),
            [target.id.to_hex(), String::new(), author.clone()],
        ),
        letter_tag(
            SingleLetterTag::lowercase(Alphabet::P),
            [author.clone(), String::new()],
        ),
        letter_tag(
            SingleLetterTag::lowercase(Alphabet::K),
            [target.kind.as_u16().to_string()],
        ),
    ];

    if is_addressable(target.kind.as_u16()) {
        tags.push(letter_tag(
            SingleLetterTag::lowercase(Alphabet::A),
            [event_coordinate(target), String::new(), author],
        ));
    }

    tags
}
