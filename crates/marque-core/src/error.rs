//! Typed errors that callers need to tell apart from plain transport failures.
//!
//! Everything else (relay errors, HTTP errors, signing errors) propagates as
//! `anyhow::Error` with these variants available via downcast.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller-supplied cancellation signal fired before the query finished.
    /// No partial results are returned.
    #[error("operation cancelled")]
    Cancelled,

    /// Profile metadata carries neither a lud16 address nor a decodable lud06.
    #[error("no lightning address found in profile metadata")]
    MissingLightningAddress,

    /// Zap amount outside the bounds advertised by the pay endpoint.
    #[error("amount must be between {min_msats} and {max_msats} millisats")]
    AmountOutOfBounds { min_msats: u64, max_msats: u64 },

    /// Input is neither a lightning address nor an lnurl string.
    #[error("invalid lightning address or lnurl: {0}")]
    InvalidLnurl(String),

    /// The pay endpoint answered but not with a usable payRequest.
    #[error("lnurl pay endpoint error: {0}")]
    LnurlPay(String),
}

impl Error {
    /// True when an `anyhow::Error` chain bottoms out in a cancellation.
    pub fn is_cancelled(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Error>(), Some(Error::Cancelled))
    }
}
