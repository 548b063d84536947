//! Ledger call payloads.
//!
//! Argument order is part of the contract: a mint takes
//! `(x, y, width, height)` with `x` the column and `y` the row, followed by
//! the media and link strings as length-prefixed arrays of 31-byte chunks.

use crate::error::{FeltError, ReservationError};
use crate::felt::{join_long_string, split_long_string, validate_text, Felt};
use crate::pricing::Amount;
use crate::types::{Rectangle, TokenId};
use serde::{Deserialize, Serialize};

/// Entry point names on the fee token and canvas contracts
pub mod entrypoints {
    /// ERC20 allowance grant on the fee token
    pub const APPROVE: &str = "approve";
    /// Mint a plot
    pub const MINT: &str = "mint";
    /// Read every plot
    pub const GET_ALL_TOKENS: &str = "getAllTokens";
    /// Read the plots held by one account
    pub const GET_TOKENS_BY_OWNER: &str = "getTokensByOwner";
    /// Replace a plot's media reference
    pub const SET_TOKEN_IMG: &str = "setTokenImg";
    /// Replace a plot's link reference
    pub const SET_TOKEN_LINK: &str = "setTokenLink";
}

/// One contract invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Target contract
    pub contract_address: Felt,
    /// Entry point name
    pub entrypoint: String,
    /// Serialized arguments
    pub calldata: Vec<Felt>,
}

/// Builds the calls of a reservation and of a plot edit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallBuilder {
    fee_token: Felt,
    canvas_contract: Felt,
}

impl CallBuilder {
    /// Builder targeting `fee_token` for approvals and `canvas_contract` for mints
    #[must_use]
    pub const fn new(fee_token: Felt, canvas_contract: Felt) -> Self {
        Self { fee_token, canvas_contract }
    }

    /// Fee token address
    #[must_use]
    pub const fn fee_token(&self) -> Felt {
        self.fee_token
    }

    /// Canvas contract address
    #[must_use]
    pub const fn canvas_contract(&self) -> Felt {
        self.canvas_contract
    }

    /// `approve(spender, amount_low, amount_high)` on the fee token
    #[must_use]
    pub fn approval_call(&self, spender: Felt, amount: Amount) -> Call {
        Call {
            contract_address: self.fee_token,
            entrypoint: entrypoints::APPROVE.to_string(),
            calldata: vec![spender, Felt::from_u128(amount.low()), Felt::from_u128(amount.high())],
        }
    }

    /// `mint(x, y, width, height, media_chunks, link_chunks)` on the canvas
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidText`] if either string contains
    /// NUL or non-ASCII characters.
    pub fn mint_call(&self, rect: &Rectangle, media_ref: &str, link_ref: &str) -> Result<Call, ReservationError> {
        let media = chunk("media", media_ref)?;
        let link = chunk("link", link_ref)?;

        let mut calldata = Vec::with_capacity(6 + media.len() + link.len());
        calldata.extend([
            Felt::from(rect.x()),
            Felt::from(rect.y()),
            Felt::from(rect.width()),
            Felt::from(rect.height()),
        ]);
        push_array(&mut calldata, media);
        push_array(&mut calldata, link);

        Ok(Call {
            contract_address: self.canvas_contract,
            entrypoint: entrypoints::MINT.to_string(),
            calldata,
        })
    }

    /// Calls replacing a plot's media and/or link
    ///
    /// Empty fields are left unchanged, so this returns zero, one or two
    /// calls (media first).
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidText`] for a token id that is not a
    /// u128 decimal or for unencodable text.
    pub fn edit_calls(&self, token_id: &TokenId, media_ref: &str, link_ref: &str) -> Result<Vec<Call>, ReservationError> {
        let token_low = token_id.as_u128().ok_or_else(|| ReservationError::InvalidText {
            field: "token_id",
            source: FeltError::InvalidNumber { input: token_id.to_string() },
        })?;

        let mut calls = Vec::with_capacity(2);
        for (field, entrypoint, text) in [
            ("media", entrypoints::SET_TOKEN_IMG, media_ref),
            ("link", entrypoints::SET_TOKEN_LINK, link_ref),
        ] {
            if text.is_empty() {
                continue;
            }
            let mut calldata = vec![Felt::from_u128(token_low), Felt::ZERO];
            push_array(&mut calldata, chunk(field, text)?);
            calls.push(Call {
                contract_address: self.canvas_contract,
                entrypoint: entrypoint.to_string(),
                calldata,
            });
        }
        Ok(calls)
    }
}

/// Decoded arguments of a `mint` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintArgs {
    /// Rectangle to mint
    pub rectangle: Rectangle,
    /// Media reference
    pub media_ref: String,
    /// Link reference
    pub link_ref: String,
}

impl MintArgs {
    /// Reads `mint` calldata back into its arguments
    ///
    /// # Errors
    ///
    /// Returns [`FeltError`] if the calldata is truncated, has trailing
    /// values, or a value does not decode.
    pub fn decode(calldata: &[Felt]) -> Result<Self, FeltError> {
        let mut reader = CalldataReader::new(calldata);
        let x = reader.next_u32()?;
        let y = reader.next_u32()?;
        let width = reader.next_u32()?;
        let height = reader.next_u32()?;
        let media_ref = join_long_string(reader.next_array()?)?;
        let link_ref = join_long_string(reader.next_array()?)?;
        reader.finish()?;

        let rectangle = Rectangle::new(x, y, width, height).map_err(|e| FeltError::MalformedCalldata { reason: e.to_string() })?;
        Ok(Self { rectangle, media_ref, link_ref })
    }
}

/// Reads `(token_low, token_high, text)` from `setTokenImg`/`setTokenLink` calldata
///
/// # Errors
///
/// Returns [`FeltError`] for truncated or malformed calldata.
pub fn decode_text_update(calldata: &[Felt]) -> Result<(TokenId, String), FeltError> {
    let mut reader = CalldataReader::new(calldata);
    let low = reader.next()?.to_u128()?;
    let _high = reader.next()?;
    let text = join_long_string(reader.next_array()?)?;
    reader.finish()?;
    Ok((TokenId::from(low), text))
}

/// Checks mint text without building calldata
///
/// Accepts exactly the inputs [`CallBuilder::mint_call`] can encode.
///
/// # Errors
///
/// Returns [`ReservationError::InvalidText`] for the first field holding a
/// NUL or non-ASCII character.
pub fn validate_mint_text(media_ref: &str, link_ref: &str) -> Result<(), ReservationError> {
    validate_text(media_ref).map_err(|source| ReservationError::InvalidText { field: "media", source })?;
    validate_text(link_ref).map_err(|source| ReservationError::InvalidText { field: "link", source })
}

fn chunk(field: &'static str, text: &str) -> Result<Vec<Felt>, ReservationError> {
    split_long_string(text).map_err(|source| ReservationError::InvalidText { field, source })
}

fn push_array(calldata: &mut Vec<Felt>, items: Vec<Felt>) {
    calldata.push(Felt::from_u64(items.len() as u64));
    calldata.extend(items);
}

struct CalldataReader<'a> {
    data: &'a [Felt],
    pos: usize,
}

impl<'a> CalldataReader<'a> {
    const fn new(data: &'a [Felt]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Result<Felt, FeltError> {
        let felt = self.data.get(self.pos).copied().ok_or_else(|| FeltError::MalformedCalldata {
            reason: format!("expected a value at position {}", self.pos),
        })?;
        self.pos += 1;
        Ok(felt)
    }

    fn next_u32(&mut self) -> Result<u32, FeltError> {
        self.next()?.to_u32()
    }

    fn next_array(&mut self) -> Result<&'a [Felt], FeltError> {
        let len = self.next_u32()? as usize;
        let end = self.pos + len;
        let items = self.data.get(self.pos..end).ok_or_else(|| FeltError::MalformedCalldata {
            reason: format!("array of {len} runs past the end of calldata"),
        })?;
        self.pos = end;
        Ok(items)
    }

    fn finish(&self) -> Result<(), FeltError> {
        if self.pos == self.data.len() {
            Ok(())
        } else {
            Err(FeltError::MalformedCalldata {
                reason: format!("{} trailing values", self.data.len() - self.pos),
            })
        }
    }
}
