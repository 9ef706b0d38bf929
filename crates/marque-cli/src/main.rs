use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use nostr_sdk::prelude::*;

use marque_core::constants::{DEFAULT_PAGE_SIZE, DEFAULT_RELAYS, SHORT_QUERY_TIMEOUT};
use marque_core::lnurl;
use marque_core::models::{count_comments, format_bookmark_count, Comment, ReactionStats};
use marque_core::nostr::{
    build_zap_request, delete_event, fetch_bookmark_event, fetch_bookmark_page, fetch_bookmarks,
    fetch_comments, fetch_follows, fetch_lightning_address, fetch_reactions, fetch_zap_stats,
    publish_bookmark, publish_comment, publish_reaction, search_bookmarks, ZapRequest,
};
use marque_core::{Bookmark, BookmarkDraft, BookmarkQuery, QueryOptions, RelayClient};

#[derive(Parser)]
#[command(name = "marque")]
#[command(about = "Decentralized bookmarking over Nostr relays")]
struct Cli {
    /// Relay URL; repeat to use several (defaults to the built-in set)
    #[arg(long, global = true)]
    relay: Vec<String>,

    /// Secret key (nsec or hex); falls back to the NOSTR_NSEC environment
    /// variable. Only needed for commands that publish.
    #[arg(long, global = true)]
    nsec: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookmarks, newest first
    List {
        /// Only bookmarks by this author (npub or hex)
        #[arg(long)]
        author: Option<String>,
        /// Only bookmarks carrying this topic tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Fetch one page of a bookmark feed
    Page {
        #[arg(long)]
        author: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
        /// Cursor from the previous page
        #[arg(long)]
        until: Option<u64>,
    },

    /// Show a single bookmark by URL
    Show {
        url: String,
        #[arg(long)]
        author: Option<String>,
    },

    /// Search bookmarks (relay-side when supported, local fallback otherwise)
    Search {
        query: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Publish a bookmark
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Topic tag; repeatable
        #[arg(long = "topic")]
        topics: Vec<String>,
    },

    /// Publish a deletion request for an event
    Delete {
        /// Event id (hex)
        event_id: String,
    },

    /// Show the comment thread for a bookmark
    Comments {
        url: String,
        #[arg(long)]
        author: Option<String>,
    },

    /// Comment on a bookmark
    Comment {
        url: String,
        content: String,
        /// Reply to an existing comment id instead of the bookmark itself
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Show reaction tallies for a bookmark
    Reactions {
        url: String,
        /// Highlight this user's own reaction (npub or hex)
        #[arg(long)]
        user: Option<String>,
    },

    /// React to a bookmark
    React {
        url: String,
        /// '+' for like, '-' for dislike, or an emoji
        #[arg(default_value = "+")]
        content: String,
    },

    /// Show zap totals for an event
    Zaps {
        /// Event id (hex)
        event_id: String,
    },

    /// List the pubkeys a user follows
    Follows {
        /// npub or hex
        pubkey: String,
    },

    /// Request a zap invoice
    ZapInvoice {
        /// Lightning address (user@domain), lnurl string, or a pubkey whose
        /// profile advertises one
        recipient: String,
        /// Amount in sats
        amount: u64,
        #[arg(long, default_value = "")]
        comment: String,
        /// Zapped event id (hex), omitted for profile zaps
        #[arg(long)]
        event_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let relays: Vec<String> = if cli.relay.is_empty() {
        DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect()
    } else {
        cli.relay.clone()
    };
    tracing::debug!(?relays, "using relays");

    run(cli, relays).await
}

fn load_keys(nsec: &Option<String>) -> Result<Keys> {
    let secret = nsec
        .clone()
        .or_else(|| std::env::var("NOSTR_NSEC").ok())
        .ok_or_else(|| anyhow!("no key: pass --nsec or set NOSTR_NSEC"))?;
    Keys::parse(&secret).context("invalid secret key")
}

fn parse_pubkey(s: &str) -> Result<PublicKey> {
    PublicKey::parse(s).with_context(|| format!("invalid pubkey: {s}"))
}

fn parse_event_id(s: &str) -> Result<EventId> {
    EventId::parse(s).with_context(|| format!("invalid event id: {s}"))
}

fn print_bookmarks(bookmarks: &[Bookmark], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(bookmarks)?);
        return Ok(());
    }
    for b in bookmarks {
        println!("{}  {}", b.url, b.title.as_deref().unwrap_or("(untitled)"));
        if !b.description.is_empty() {
            println!("    {}", b.description);
        }
        if !b.tags.is_empty() {
            println!("    #{}", b.tags.join(" #"));
        }
    }
    Ok(())
}

fn print_comment_tree(comments: &[Comment], depth: usize) {
    for comment in comments {
        println!(
            "{}{}  {}",
            "  ".repeat(depth),
            &comment.author[..8.min(comment.author.len())],
            comment.content
        );
        print_comment_tree(&comment.replies, depth + 1);
    }
}

async fn find_root_event(
    client: &RelayClient,
    url: &str,
    author: Option<PublicKey>,
) -> Result<Event> {
    fetch_bookmark_event(
        client,
        url,
        author,
        &QueryOptions::with_timeout(SHORT_QUERY_TIMEOUT),
    )
    .await?
    .ok_or_else(|| anyhow!("no bookmark found for {url}"))
}

async fn run(cli: Cli, relays: Vec<String>) -> Result<()> {
    let opts = QueryOptions::default();

    match cli.command {
        Commands::List {
            author,
            tags,
            limit,
        } => {
            let client = RelayClient::connect(&relays).await?;
            let query = BookmarkQuery {
                author: author.as_deref().map(parse_pubkey).transpose()?,
                hashtags: tags,
                limit,
                ..Default::default()
            };
            let bookmarks = fetch_bookmarks(&client, &query, &opts).await?;
            print_bookmarks(&bookmarks, cli.json)?;
            client.disconnect().await;
        }

        Commands::Page {
            author,
            page_size,
            until,
        } => {
            let client = RelayClient::connect(&relays).await?;
            let query = BookmarkQuery {
                author: author.as_deref().map(parse_pubkey).transpose()?,
                ..Default::default()
            };
            let page = fetch_bookmark_page(&client, &query, page_size, until, &opts).await?;
            print_bookmarks(&page.bookmarks, cli.json)?;
            if !cli.json {
                let shown = format_bookmark_count(page.bookmarks.len(), page.next_cursor.is_some());
                match page.next_cursor {
                    Some(cursor) => println!("{shown} shown, next: --until {cursor}"),
                    None => println!("{shown} shown, end of feed"),
                }
            }
            client.disconnect().await;
        }

        Commands::Show { url, author } => {
            let client = RelayClient::connect(&relays).await?;
            let author = author.as_deref().map(parse_pubkey).transpose()?;
            let event = find_root_event(&client, &url, author).await?;
            match Bookmark::from_event(&event) {
                Some(bookmark) => print_bookmarks(std::slice::from_ref(&bookmark), cli.json)?,
                None => return Err(anyhow!("event {} is not a bookmark", event.id)),
            }
            client.disconnect().await;
        }

        Commands::Search {
            query,
            author,
            tags,
            limit,
        } => {
            let client = RelayClient::connect(&relays).await?;
            let query = BookmarkQuery {
                author: author.as_deref().map(parse_pubkey).transpose()?,
                hashtags: tags,
                search: Some(query),
                limit,
                ..Default::default()
            };
            let bookmarks = search_bookmarks(&client, &query, &opts).await?;
            print_bookmarks(&bookmarks, cli.json)?;
            client.disconnect().await;
        }

        Commands::Add {
            url,
            title,
            description,
            topics,
        } => {
            let keys = load_keys(&cli.nsec)?;
            let client = RelayClient::connect_with_keys(keys, &relays).await?;
            let draft = BookmarkDraft {
                url,
                title,
                description,
                topics,
            };
            let id = publish_bookmark(&client, &draft).await?;
            println!("published {}", id.to_hex());
            client.disconnect().await;
        }

        Commands::Delete { event_id } => {
            let keys = load_keys(&cli.nsec)?;
            let client = RelayClient::connect_with_keys(keys, &relays).await?;
            let id = delete_event(&client, parse_event_id(&event_id)?, "").await?;
            println!("published deletion {}", id.to_hex());
            client.disconnect().await;
        }

        Commands::Comments { url, author } => {
            let client = RelayClient::connect(&relays).await?;
            let author = author.as_deref().map(parse_pubkey).transpose()?;
            let root = find_root_event(&client, &url, author).await?;
            let comments = fetch_comments(&client, &root, &opts).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            } else {
                let counts = count_comments(&comments, None);
                println!("{} comments", counts.total);
                print_comment_tree(&comments, 0);
            }
            client.disconnect().await;
        }

        Commands::Comment {
            url,
            content,
            reply_to,
        } => {
            let keys = load_keys(&cli.nsec)?;
            let client = RelayClient::connect_with_keys(keys, &relays).await?;
            let root = find_root_event(&client, &url, None).await?;

            let parent = match reply_to {
                Some(parent_id) => {
                    let comments = fetch_comments(&client, &root, &opts).await?;
                    Some(
                        find_comment(&comments, &parent_id)
                            .ok_or_else(|| anyhow!("comment {parent_id} not found in thread"))?,
                    )
                }
                None => None,
            };
            let id = publish_comment(&client, &root, parent.as_ref(), &content).await?;
            println!("published comment {}", id.to_hex());
            client.disconnect().await;
        }

        Commands::Reactions { url, user } => {
            let client = RelayClient::connect(&relays).await?;
            let target = find_root_event(&client, &url, None).await?;
            let reactions = fetch_reactions(&client, &target, &opts).await?;
            let user = user.as_deref().map(parse_pubkey).transpose()?;
            let user_hex = user.map(|pk| pk.to_hex());
            let stats = ReactionStats::from_reactions(&reactions, user_hex.as_deref());
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "{} reactions: {} likes, {} dislikes",
                    stats.total, stats.likes, stats.dislikes
                );
                if let Some(own) = &stats.user_reaction {
                    println!("your reaction: {}", own.content);
                }
            }
            client.disconnect().await;
        }

        Commands::React { url, content } => {
            let keys = load_keys(&cli.nsec)?;
            let client = RelayClient::connect_with_keys(keys, &relays).await?;
            let target = find_root_event(&client, &url, None).await?;
            let id = publish_reaction(&client, &target, &content).await?;
            println!("published reaction {}", id.to_hex());
            client.disconnect().await;
        }

        Commands::Zaps { event_id } => {
            let client = RelayClient::connect(&relays).await?;
            let stats = fetch_zap_stats(&client, parse_event_id(&event_id)?, &opts).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "{} zaps, {} sats total",
                    stats.total_count, stats.total_amount_sats
                );
            }
            client.disconnect().await;
        }

        Commands::Follows { pubkey } => {
            let client = RelayClient::connect(&relays).await?;
            let follows = fetch_follows(
                &client,
                parse_pubkey(&pubkey)?,
                &QueryOptions::with_timeout(SHORT_QUERY_TIMEOUT),
            )
            .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&follows)?);
            } else {
                for pk in follows {
                    println!("{pk}");
                }
            }
            client.disconnect().await;
        }

        Commands::ZapInvoice {
            recipient,
            amount,
            comment,
            event_id,
        } => {
            let keys = load_keys(&cli.nsec)?;
            let http = reqwest::Client::new();
            let amount_msats = amount * 1000;

            let is_direct =
                recipient.contains('@') || recipient.to_lowercase().starts_with("lnurl");
            let (address, recipient_pubkey) = if is_direct {
                (recipient, None)
            } else {
                let pubkey = parse_pubkey(&recipient)?;
                let client = RelayClient::connect(&relays).await?;
                let address = fetch_lightning_address(
                    &client,
                    pubkey,
                    &QueryOptions::with_timeout(SHORT_QUERY_TIMEOUT),
                )
                .await?;
                client.disconnect().await;
                (address, Some(pubkey))
            };

            let info = lnurl::resolve_lnurl_pay(&http, &address).await?;
            lnurl::validate_amount(amount_msats, &info)?;

            let zap_request = zap_request_param(
                &keys,
                &info,
                recipient_pubkey,
                amount_msats,
                comment,
                event_id.as_deref().map(parse_event_id).transpose()?,
                relays,
            )?;

            let invoice = lnurl::request_invoice(
                &http,
                &info.callback,
                amount_msats,
                zap_request.as_deref(),
                None,
            )
            .await?;
            println!("{invoice}");
        }
    }

    Ok(())
}

/// Build the signed zap request for the LNURL callback's `nostr` parameter.
///
/// The `p` tag must name the zapped profile, so a request is only built when
/// the recipient's pubkey is known (the input was a pubkey) and the endpoint
/// advertises nostr support. Otherwise a plain invoice is requested instead;
/// a request attributed to anyone else would be wrong.
fn zap_request_param(
    keys: &Keys,
    info: &lnurl::LnurlPayInfo,
    recipient: Option<PublicKey>,
    amount_msats: u64,
    comment: String,
    event_id: Option<EventId>,
    relays: Vec<String>,
) -> Result<Option<String>> {
    match recipient {
        Some(recipient) if info.allows_nostr => Ok(Some(build_zap_request(
            keys,
            &ZapRequest {
                recipient,
                amount_msats,
                comment,
                event_id,
                lnurl: None,
                relays,
            },
        )?)),
        _ => Ok(None),
    }
}

fn find_comment(comments: &[Comment], id: &str) -> Option<Comment> {
    for comment in comments {
        if comment.id == id {
            return Some(comment.clone());
        }
        if let Some(found) = find_comment(&comment.replies, id) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use marque_core::models::tag_utils::extract_all_tag_values;

    fn pay_info(allows_nostr: bool) -> lnurl::LnurlPayInfo {
        lnurl::LnurlPayInfo {
            callback: "https://example.com/cb".to_string(),
            min_sendable: 1_000,
            max_sendable: 1_000_000,
            metadata: String::new(),
            tag: "payRequest".to_string(),
            allows_nostr,
            nostr_pubkey: None,
        }
    }

    #[test]
    fn test_zap_request_names_the_zapped_profile() {
        let keys = Keys::generate();
        let zapped = Keys::generate().public_key();

        let json = zap_request_param(
            &keys,
            &pay_info(true),
            Some(zapped),
            21_000,
            String::new(),
            None,
            vec!["wss://relay.damus.io".to_string()],
        )
        .unwrap()
        .expect("zap request built");

        let event = Event::from_json(&json).unwrap();
        let p_tags = extract_all_tag_values(&event, "p");
        assert_eq!(p_tags, vec![zapped.to_hex()]);
        assert_ne!(p_tags[0], keys.public_key().to_hex(), "never the sender");
    }

    #[test]
    fn test_no_zap_request_without_known_recipient() {
        let keys = Keys::generate();
        let param = zap_request_param(
            &keys,
            &pay_info(true),
            None,
            21_000,
            String::new(),
            None,
            Vec::new(),
        )
        .unwrap();
        assert!(param.is_none());
    }

    #[test]
    fn test_no_zap_request_when_endpoint_lacks_nostr_support() {
        let keys = Keys::generate();
        let param = zap_request_param(
            &keys,
            &pay_info(false),
            Some(Keys::generate().public_key()),
            21_000,
            String::new(),
            None,
            Vec::new(),
        )
        .unwrap();
        assert!(param.is_none());
    }
}
