//! LNURL-pay flow (lud06/lud16): resolve a lightning address to its pay
//! endpoint, validate amounts, and request bolt11 invoices.
//!
//! Payment execution itself is out of scope; callers hand the returned
//! invoice to an external wallet.

use anyhow::{Context, Result};
use bech32::FromBase32;
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Response of a `.well-known/lnurlp` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayInfo {
    pub callback: String,
    /// Minimum payable amount in millisats
    pub min_sendable: u64,
    /// Maximum payable amount in millisats
    pub max_sendable: u64,
    #[serde(default)]
    pub metadata: String,
    pub tag: String,
    #[serde(default)]
    pub allows_nostr: bool,
    #[serde(default)]
    pub nostr_pubkey: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LnurlInvoiceResponse {
    pr: Option<String>,
}

/// Decode a bech32-encoded `lnurl1...` string into the URL it wraps.
pub fn decode_lnurl(lnurl: &str) -> Result<String> {
    let (_hrp, data, _variant) =
        bech32::decode(lnurl).map_err(|e| Error::InvalidLnurl(e.to_string()))?;
    let bytes =
        Vec::<u8>::from_base32(&data).map_err(|e| Error::InvalidLnurl(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidLnurl(e.to_string()).into())
}

/// Resolve a lightning address (`user@domain`) or an `lnurl1...` string to
/// the HTTPS endpoint serving its pay information.
pub fn pay_endpoint(address_or_lnurl: &str) -> Result<String> {
    if let Some((user, domain)) = address_or_lnurl.split_once('@') {
        return Ok(format!("https://{domain}/.well-known/lnurlp/{user}"));
    }
    if address_or_lnurl.to_lowercase().starts_with("lnurl") {
        return decode_lnurl(address_or_lnurl);
    }
    Err(Error::InvalidLnurl(address_or_lnurl.to_string()).into())
}

/// Pull a lightning address out of profile metadata: `lud16` preferred,
/// otherwise the raw `lud06` lnurl string. Returns `None` when neither is
/// usable.
pub fn lightning_address_from_metadata(metadata: &serde_json::Value) -> Option<String> {
    if let Some(lud16) = metadata.get("lud16").and_then(|v| v.as_str()) {
        if !lud16.is_empty() {
            return Some(lud16.to_string());
        }
    }
    metadata
        .get("lud06")
        .and_then(|v| v.as_str())
        .filter(|lud06| decode_lnurl(lud06).is_ok())
        .map(String::from)
}

/// Fetch pay information for a lightning address or lnurl.
pub async fn resolve_lnurl_pay(
    http: &reqwest::Client,
    address_or_lnurl: &str,
) -> Result<LnurlPayInfo> {
    let url = pay_endpoint(address_or_lnurl)?;
    debug!(%url, "resolving lnurl pay info");

    let info: LnurlPayInfo = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("malformed lnurl pay response")?;

    if info.tag != "payRequest" {
        return Err(Error::LnurlPay(format!("unexpected tag {:?}", info.tag)).into());
    }
    Ok(info)
}

/// Check an amount against the bounds advertised by the pay endpoint.
pub fn validate_amount(amount_msats: u64, info: &LnurlPayInfo) -> Result<()> {
    if amount_msats < info.min_sendable || amount_msats > info.max_sendable {
        return Err(Error::AmountOutOfBounds {
            min_msats: info.min_sendable,
            max_msats: info.max_sendable,
        }
        .into());
    }
    Ok(())
}

/// Request a bolt11 invoice from the pay endpoint's callback. `zap_request`
/// is the JSON-encoded signed zap request event, passed when the endpoint
/// advertises nostr support.
pub async fn request_invoice(
    http: &reqwest::Client,
    callback: &str,
    amount_msats: u64,
    zap_request: Option<&str>,
    lnurl: Option<&str>,
) -> Result<String> {
    let mut params = vec![("amount", amount_msats.to_string())];
    if let Some(zap_request) = zap_request {
        params.push(("nostr", zap_request.to_string()));
    }
    if let Some(lnurl) = lnurl {
        params.push(("lnurl", lnurl.to_string()));
    }

    let response: LnurlInvoiceResponse = http
        .get(callback)
        .query(&params)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("malformed invoice response")?;

    response
        .pr
        .filter(|pr| !pr.is_empty())
        .ok_or_else(|| Error::LnurlPay("no invoice returned from callback".to_string()).into())
}
