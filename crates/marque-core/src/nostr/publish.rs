//! Write operations: build, sign and broadcast domain events.
//!
//! Tag construction lives in the model modules; this layer only assembles
//! the event builders and hands them to the publish capability.

use anyhow::Result;
use nostr_sdk::prelude::*;
use tracing::debug;

use super::client::RelayPublish;
use crate::constants::kinds;
use crate::models::comment::{comment_tags, Comment};
use crate::models::reaction::reaction_tags;
use crate::models::zap::zap_request_tags;
use crate::models::BookmarkDraft;

/// Publish a bookmark event. Republishing the same URL supersedes the
/// previous version (addressable events are keyed by the d-tag).
pub async fn publish_bookmark<C: RelayPublish>(client: &C, draft: &BookmarkDraft) -> Result<EventId> {
    let builder =
        EventBuilder::new(Kind::Custom(kinds::BOOKMARK), &draft.description).tags(draft.to_tags());
    let id = client.publish(builder).await?;
    debug!(%id, url = %draft.url, "published bookmark");
    Ok(id)
}

/// Publish a deletion request for an event. Tombstone filtering is left
/// entirely to relays; reads do not filter deleted ids locally.
pub async fn delete_event<C: RelayPublish>(
    client: &C,
    target_id: EventId,
    reason: &str,
) -> Result<EventId> {
    let builder = EventBuilder::new(Kind::Custom(kinds::DELETION), reason).tag(Tag::event(target_id));
    client.publish(builder).await
}

/// Publish a comment on `root`, optionally as a reply to an existing
/// comment.
pub async fn publish_comment<C: RelayPublish>(
    client: &C,
    root: &Event,
    parent: Option<&Comment>,
    content: &str,
) -> Result<EventId> {
    let builder =
        EventBuilder::new(Kind::Custom(kinds::COMMENT), content).tags(comment_tags(root, parent));
    client.publish(builder).await
}

/// Publish a reaction to `target`. Content is `+`, `-`, or an emoji.
pub async fn publish_reaction<C: RelayPublish>(
    client: &C,
    target: &Event,
    content: &str,
) -> Result<EventId> {
    let builder =
        EventBuilder::new(Kind::Custom(kinds::REACTION), content).tags(reaction_tags(target));
    client.publish(builder).await
}

/// Retract a previous reaction by publishing a deletion request for it.
pub async fn delete_reaction<C: RelayPublish>(client: &C, reaction_id: EventId) -> Result<EventId> {
    delete_event(client, reaction_id, "Deleted reaction").await
}

/// Parameters for a NIP-57 zap request.
#[derive(Debug, Clone)]
pub struct ZapRequest {
    pub recipient: PublicKey,
    /// Amount in millisats
    pub amount_msats: u64,
    pub comment: String,
    /// Event being zapped, absent for profile zaps
    pub event_id: Option<EventId>,
    pub lnurl: Option<String>,
    pub relays: Vec<String>,
}

/// Build and sign a zap request event, returning its JSON encoding for the
/// LNURL callback's `nostr` parameter. The request is signed locally and
/// never broadcast to relays directly; the receiving wallet publishes the
/// matching receipt.
pub fn build_zap_request(keys: &Keys, request: &ZapRequest) -> Result<String> {
    let event = EventBuilder::new(Kind::Custom(kinds::ZAP_REQUEST), &request.comment)
        .tags(zap_request_tags(
            &request.relays,
            request.amount_msats,
            &request.recipient,
            request.lnurl.as_deref(),
            request.event_id.as_ref(),
        ))
        .sign_with_keys(keys)?;
    Ok(serde_json::to_string(&event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tag_utils::{extract_all_tag_values, extract_tag_str};

    #[test]
    fn test_build_zap_request_is_valid_json_event() {
        let keys = Keys::generate();
        let recipient = Keys::generate().public_key();
        let json = build_zap_request(
            &keys,
            &ZapRequest {
                recipient,
                amount_msats: 21_000,
                comment: "great bookmark".to_string(),
                event_id: None,
                lnurl: None,
                relays: vec!["wss://relay.damus.io".to_string()],
            },
        )
        .unwrap();

        let event = Event::from_json(&json).expect("round-trips as an event");
        assert_eq!(event.kind.as_u16(), kinds::ZAP_REQUEST);
        assert_eq!(event.content, "great bookmark");
        assert_eq!(extract_tag_str(&event, "amount"), Some("21000"));
        assert_eq!(extract_all_tag_values(&event, "p"), vec![recipient.to_hex()]);
        assert!(event.verify().is_ok());
    }
}
