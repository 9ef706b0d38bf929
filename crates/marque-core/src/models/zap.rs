//! Zap receipts (NIP-57 kind:9735) and zap request construction.

use nostr_sdk::prelude::*;
use serde::Serialize;

use super::tag_utils::{extract_tag_str, letter_tag, word_tag};

/// Unit-letter multipliers for the bolt11 amount field, in satoshis.
const MILLI_BTC_SATS: f64 = 100_000.0;
const MICRO_BTC_SATS: f64 = 100.0;
const NANO_BTC_SATS: f64 = 0.1;
const PICO_BTC_SATS: f64 = 0.0001;

/// Extract the payment amount from a bolt11 invoice string, in satoshis.
///
/// Only the `lnbc<digits><unit?>` amount component is read; every other
/// invoice field is ignored. Returns 0 when the pattern does not match.
/// Fractional results from `n`/`p` units are not rounded, so aggregate
/// totals can be non-integer.
pub fn decode_invoice_amount_sats(invoice: &str) -> f64 {
    for (pos, _) in invoice.match_indices("lnbc") {
        let rest = &invoice[pos + 4..];
        let digits: &str = &rest[..rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len())];
        if digits.is_empty() {
            continue;
        }

        let amount: f64 = match digits.parse() {
            Ok(amount) => amount,
            Err(_) => continue,
        };

        let multiplier = match rest[digits.len()..].chars().next() {
            Some('m') => MILLI_BTC_SATS,
            Some('u') => MICRO_BTC_SATS,
            Some('n') => NANO_BTC_SATS,
            Some('p') => PICO_BTC_SATS,
            _ => 1.0,
        };

        return amount * multiplier;
    }
    0.0
}

/// Aggregate zap totals for one event, derived from its receipts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ZapStats {
    pub total_count: usize,
    pub total_amount_sats: f64,
}

impl ZapStats {
    /// Sum the decoded invoice amounts across receipt events. Receipts
    /// without a `bolt11` tag, or with an undecodable invoice, contribute
    /// nothing to the amount but still count.
    pub fn from_receipts(receipts: &[Event]) -> Self {
        ZapStats {
            total_count: receipts.len(),
            total_amount_sats: receipts
                .iter()
                .filter_map(|receipt| extract_tag_str(receipt, "bolt11"))
                .map(decode_invoice_amount_sats)
                .sum(),
        }
    }
}

/// Build the tag array for a NIP-57 zap request: `relays`, `amount`
/// (millisats), `p`, then optional `lnurl` and `e` tags.
pub fn zap_request_tags(
    relays: &[String],
    amount_msats: u64,
    recipient: &PublicKey,
    lnurl: Option<&str>,
    event_id: Option<&EventId>,
) -> Vec<Tag> {
    let mut tags = vec![
        word_tag("relays", relays.iter().cloned()),
        word_tag("amount", [amount_msats.to_string()]),
        letter_tag(SingleLetterTag::lowercase(Alphabet::P), [recipient.to_hex()]),
    ];

    if let Some(lnurl) = lnurl {
        tags.push(word_tag("lnurl", [lnurl]));
    }
    if let Some(event_id) = event_id {
        tags.push(letter_tag(
            SingleLetterTag::lowercase(Alphabet::E),
            [event_id.to_hex()],
        ));
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::kinds;
    use crate::models::tag_utils::extract_all_tag_values;

    #[test]
    fn test_decode_invoice_amounts() {
        assert_eq!(decode_invoice_amount_sats("lnbc100m1pjluenhpp5"), 10_000_000.0);
        assert_eq!(decode_invoice_amount_sats("lnbc21u1pjluenhpp5"), 2_100.0);
        assert_eq!(decode_invoice_amount_sats("lnbc42"), 42.0);
        assert_eq!(decode_invoice_amount_sats("not-an-invoice"), 0.0);
    }

    #[test]
    fn test_decode_fractional_sats_not_rounded() {
        assert_eq!(decode_invoice_amount_sats("lnbc15n1pjluenhpp5"), 1.5);
        assert_eq!(decode_invoice_amount_sats("lnbc5p1pjluenhpp5"), 0.0005);
    }

    #[test]
    fn test_decode_skips_prefix_without_digits() {
        // The amount scan continues past an lnbc occurrence with no digits
        assert_eq!(decode_invoice_amount_sats("lnbcxlnbc21u"), 2_100.0);
        assert_eq!(decode_invoice_amount_sats("lnbc"), 0.0);
    }

    fn receipt(bolt11: Option<&str>) -> Event {
        let keys = Keys::generate();
        let tags = match bolt11 {
            Some(invoice) => vec![word_tag("bolt11", [invoice])],
            None => Vec::new(),
        };
        EventBuilder::new(Kind::Custom(kinds::ZAP_RECEIPT), "")
            .tags(tags)
            .sign_with_keys(&keys)
            .unwrap()
    }

    #[test]
    fn test_zap_stats_from_receipts() {
        let receipts = vec![
            receipt(Some("lnbc21u1pjluenhpp5")),
            receipt(Some("lnbc100u1pjluenhpp5")),
            receipt(Some("garbage")),
            receipt(None),
        ];

        let stats = ZapStats::from_receipts(&receipts);
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.total_amount_sats, 12_100.0);
    }

    #[test]
    fn test_zap_request_tags() {
        let keys = Keys::generate();
        let recipient = Keys::generate().public_key();
        let target = EventBuilder::new(Kind::from(1), "note")
            .sign_with_keys(&keys)
            .unwrap();
        let relays = vec![
            "wss://relay.damus.io".to_string(),
            "wss://nos.lol".to_string(),
        ];

        let event = EventBuilder::new(Kind::Custom(kinds::ZAP_REQUEST), "great post")
            .tags(zap_request_tags(
                &relays,
                21_000,
                &recipient,
                Some("lnurl1example"),
                Some(&target.id),
            ))
            .sign_with_keys(&keys)
            .unwrap();

        assert_eq!(
            extract_all_tag_values(&event, "relays"),
            vec!["wss://relay.damus.io"]
        );
        assert_eq!(extract_all_tag_values(&event, "amount"), vec!["21000"]);
        assert_eq!(extract_all_tag_values(&event, "p"), vec![recipient.to_hex()]);
        assert_eq!(extract_all_tag_values(&event, "lnurl"), vec!["lnurl1example"]);
        assert_eq!(extract_all_tag_values(&event, "e"), vec![target.id.to_hex()]);
    }
}
