//! Relay client wrapper.
//!
//! Wraps `nostr_sdk::Client` behind small capability traits so that read and
//! write operations take an explicit handle instead of reaching for a global
//! client, and so the fallback search engine can be tested against a fake.

use std::time::Duration;

use anyhow::Result;
use nostr_sdk::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::{DEFAULT_QUERY_TIMEOUT, SEND_TIMEOUT};
use crate::error::Error;

/// Per-query bounds: an internal timeout and an optional caller-supplied
/// cancellation signal. Whichever fires first aborts the in-flight request;
/// a cancelled query fails with `Error::Cancelled` and returns no partial
/// results.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub timeout: Duration,
    pub cancel: Option<CancellationToken>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            timeout: DEFAULT_QUERY_TIMEOUT,
            cancel: None,
        }
    }
}

impl QueryOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        QueryOptions {
            timeout,
            ..Default::default()
        }
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Relay read capability.
pub trait RelayQuery {
    fn query(
        &self,
        filter: Filter,
        opts: &QueryOptions,
    ) -> impl std::future::Future<Output = Result<Vec<Event>>> + Send;
}

/// Relay write capability: sign (via the client's signer) and broadcast.
pub trait RelayPublish {
    fn publish(
        &self,
        builder: EventBuilder,
    ) -> impl std::future::Future<Output = Result<EventId>> + Send;
}

pub struct RelayClient {
    client: Client,
}

impl RelayClient {
    /// Connect a read-only client (no signer) to the given relays.
    pub async fn connect<I, S>(relays: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client = Client::default();
        for relay in relays {
            client.add_relay(relay.as_ref()).await?;
        }
        client.connect().await;
        Ok(RelayClient { client })
    }

    /// Connect a signing client; required for the publish capability.
    pub async fn connect_with_keys<I, S>(keys: Keys, relays: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client = Client::new(keys);
        for relay in relays {
            client.add_relay(relay.as_ref()).await?;
        }
        client.connect().await;
        Ok(RelayClient { client })
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }
}

impl RelayQuery for RelayClient {
    async fn query(&self, filter: Filter, opts: &QueryOptions) -> Result<Vec<Event>> {
        let fetch = self.client.fetch_events(filter, opts.timeout);
        let events = match &opts.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled.into()),
                    result = fetch => result?,
                }
            }
            None => fetch.await?,
        };
        debug!(count = events.len(), "fetched events");
        Ok(events.into_iter().collect())
    }
}

impl RelayPublish for RelayClient {
    async fn publish(&self, builder: EventBuilder) -> Result<EventId> {
        match tokio::time::timeout(SEND_TIMEOUT, self.client.send_event_builder(builder)).await {
            Ok(Ok(output)) => Ok(*output.id()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("timeout sending event to relays")),
        }
    }
}

/// Issue several filters sequentially against one read capability,
/// de-duplicating results by event id (a comment matching both the `E` and
/// `A` query must appear once).
pub async fn query_many<C: RelayQuery>(
    client: &C,
    filters: Vec<Filter>,
    opts: &QueryOptions,
) -> Result<Vec<Event>> {
    let mut seen = std::collections::HashSet::new();
    let mut events = Vec::new();
    for filter in filters {
        for event in client.query(filter, opts).await? {
            if seen.insert(event.id) {
                events.push(event);
            }
        }
    }
    Ok(events)
}
