//! Ledger boundary.
//!
//! The reservation workflow talks to the ledger only through
//! [`LedgerClient`]. Raw token records come back with coordinates and
//! chunked strings as field elements; [`decode_token`] turns them into
//! [`Plot`]s.

mod memory;

pub use memory::InMemoryLedger;

use crate::error::FeltError;
use crate::felt::{join_long_string, split_long_string, Felt};
use crate::calls::Call;
use crate::types::{Plot, Rectangle, TokenId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Ledger operation result
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Boxed future returned by [`LedgerClient`] methods
pub type LedgerFuture<T> = Pin<Box<dyn Future<Output = LedgerResult<T>> + Send>>;

/// Ledger errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The transaction was rejected (reverted, refused by the account, ...)
    #[error("Transaction rejected: {reason}")]
    Rejected {
        /// Rejection message
        reason: String,
    },

    /// Network or node failure
    #[error("Ledger unavailable: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// No answer within the configured bound
    #[error("Ledger call timed out after {0:?}")]
    Timeout(Duration),

    /// Response did not have the expected shape
    #[error("Malformed ledger response: {reason}")]
    Malformed {
        /// What was wrong
        reason: String,
    },
}

impl From<FeltError> for LedgerError {
    fn from(error: FeltError) -> Self {
        Self::Malformed { reason: error.to_string() }
    }
}

/// Receipt of an accepted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash
    pub transaction_hash: Felt,
    /// Values returned by the last call (for `mint`, the u256 token id)
    pub returned: Vec<Felt>,
}

/// A plot as stored on the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTokenRecord {
    /// Token id, low 128 bits
    pub token_low: Felt,
    /// Token id, high 128 bits
    pub token_high: Felt,
    /// Origin column
    pub xpos: Felt,
    /// Origin row
    pub ypos: Felt,
    /// Width in cells
    pub width: Felt,
    /// Height in cells
    pub height: Felt,
    /// Media reference chunks
    pub img: Vec<Felt>,
    /// Link reference chunks
    pub link: Vec<Felt>,
}

impl RawTokenRecord {
    /// Encodes a plot the way the ledger stores it
    ///
    /// # Errors
    ///
    /// Returns [`FeltError`] for a token id that is not a u128 decimal or for
    /// unencodable text.
    pub fn from_plot(plot: &Plot) -> Result<Self, FeltError> {
        let token_low = plot
            .token_id
            .as_u128()
            .ok_or_else(|| FeltError::InvalidNumber { input: plot.token_id.to_string() })?;
        Ok(Self {
            token_low: Felt::from_u128(token_low),
            token_high: Felt::ZERO,
            xpos: Felt::from(plot.origin.col),
            ypos: Felt::from(plot.origin.row),
            width: Felt::from(plot.width),
            height: Felt::from(plot.height),
            img: split_long_string(&plot.media_ref)?,
            link: split_long_string(&plot.link_ref)?,
        })
    }
}

/// Ledger client
///
/// Abstraction over the network client and wallet account that submit
/// transactions and read contract state.
pub trait LedgerClient: Send + Sync {
    /// Submit calls as one transaction, in order
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the transaction is rejected or cannot be sent.
    fn execute(&self, calls: Vec<Call>) -> LedgerFuture<TxReceipt>;

    /// Read every minted plot (`getAllTokens`)
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the read fails.
    fn all_tokens(&self) -> LedgerFuture<Vec<RawTokenRecord>>;

    /// Read the plots held by `owner` (`getTokensByOwner`)
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the read fails.
    fn tokens_by_owner(&self, owner: Felt) -> LedgerFuture<Vec<RawTokenRecord>>;
}

/// Decodes a raw record into a plot
///
/// The token id is the decimal rendering of the low half; `xpos` is the
/// column and `ypos` the row of the origin.
///
/// # Errors
///
/// Returns [`LedgerError::Malformed`] if a field does not decode.
pub fn decode_token(record: &RawTokenRecord) -> LedgerResult<Plot> {
    let token_id = TokenId::from(record.token_low.to_u128()?);
    let col = record.xpos.to_u32()?;
    let row = record.ypos.to_u32()?;
    let rect = Rectangle::new(col, row, record.width.to_u32()?, record.height.to_u32()?)
        .map_err(|e| LedgerError::Malformed { reason: format!("token {token_id}: {e}") })?;

    Ok(Plot::minted(
        token_id,
        rect,
        join_long_string(&record.img)?,
        join_long_string(&record.link)?,
    ))
}

/// Decodes every record, failing on the first malformed one
///
/// # Errors
///
/// Returns [`LedgerError::Malformed`] if any record does not decode.
pub fn decode_tokens(records: &[RawTokenRecord]) -> LedgerResult<Vec<Plot>> {
    records.iter().map(decode_token).collect()
}

/// Token id returned by a `mint` receipt
///
/// # Errors
///
/// Returns [`LedgerError::Malformed`] if the receipt carries no id.
pub fn minted_token_id(receipt: &TxReceipt) -> LedgerResult<TokenId> {
    let low = receipt.returned.first().ok_or_else(|| LedgerError::Malformed {
        reason: format!("mint receipt {} carries no token id", receipt.transaction_hash),
    })?;
    Ok(TokenId::from(low.to_u128()?))
}

/// Bounds a ledger future by `timeout`; `None` waits indefinitely
///
/// # Errors
///
/// Returns [`LedgerError::Timeout`] on expiry, or the future's own error.
pub async fn with_timeout<T>(timeout: Option<Duration>, fut: LedgerFuture<T>) -> LedgerResult<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(LedgerError::Timeout(limit))),
        None => fut.await,
    }
}
