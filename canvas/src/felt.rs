//! Ledger field elements and the long-string chunk codec.
//!
//! The ledger's primitive value is a field element below
//! `P = 2^251 + 17 * 2^192 + 1`. A short string packs at most
//! [`SHORT_STRING_MAX_LEN`] ASCII bytes big-endian into one element; longer
//! strings travel as an ordered array of short strings.
//!
//! The chunk size is a wire format shared with the on-ledger decoder.
//! Changing it corrupts every stored media and link reference.

use crate::error::FeltError;
use serde::{Deserialize, Serialize};

/// Maximum bytes in one short string
pub const SHORT_STRING_MAX_LEN: usize = 31;

/// Field prime, big-endian
const PRIME: [u8; 32] = [
    0x08, 0, 0, 0, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0x01,
];

/// A field element, stored as 32 big-endian bytes
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Felt([u8; 32]);

impl Felt {
    /// Zero
    pub const ZERO: Self = Self([0; 32]);

    /// Converts from a u64
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(u128::from(value))
    }

    /// Converts from a u128 (always below the prime)
    #[must_use]
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Builds a felt from big-endian bytes
    ///
    /// # Errors
    ///
    /// Returns [`FeltError::OutOfRange`] if the value is not below the prime.
    pub fn from_bytes_be(bytes: [u8; 32]) -> Result<Self, FeltError> {
        if bytes < PRIME {
            Ok(Self(bytes))
        } else {
            Err(FeltError::OutOfRange)
        }
    }

    /// Big-endian bytes
    #[must_use]
    pub const fn to_bytes_be(&self) -> [u8; 32] {
        self.0
    }

    /// Parses a hex literal, with or without `0x`
    ///
    /// # Errors
    ///
    /// [`FeltError::InvalidHex`] for malformed input, [`FeltError::OutOfRange`]
    /// if the value is not below the prime.
    pub fn from_hex(input: &str) -> Result<Self, FeltError> {
        let invalid = || FeltError::InvalidHex { input: input.to_string() };

        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.is_empty() {
            return Err(invalid());
        }
        let digits = digits.trim_start_matches('0');
        if digits.len() > 64 {
            return Err(FeltError::OutOfRange);
        }

        let mut bytes = [0u8; 32];
        for (i, ch) in digits.bytes().rev().enumerate() {
            let nibble = (ch as char).to_digit(16).ok_or_else(invalid)?;
            #[allow(clippy::cast_possible_truncation)] // nibble < 16
            let nibble = nibble as u8;
            let byte = &mut bytes[31 - i / 2];
            *byte |= if i % 2 == 0 { nibble } else { nibble << 4 };
        }
        Self::from_bytes_be(bytes)
    }

    /// Parses a non-negative decimal literal
    ///
    /// # Errors
    ///
    /// [`FeltError::InvalidNumber`] for malformed input, [`FeltError::OutOfRange`]
    /// if the value is not below the prime.
    pub fn from_dec_str(input: &str) -> Result<Self, FeltError> {
        if input.is_empty() {
            return Err(FeltError::InvalidNumber { input: input.to_string() });
        }

        let mut bytes = [0u8; 32];
        for ch in input.chars() {
            let digit = ch
                .to_digit(10)
                .ok_or_else(|| FeltError::InvalidNumber { input: input.to_string() })?;
            let mut carry = digit;
            for byte in bytes.iter_mut().rev() {
                let value = u32::from(*byte) * 10 + carry;
                #[allow(clippy::cast_possible_truncation)] // low byte only
                let low = value as u8;
                *byte = low;
                carry = value >> 8;
            }
            if carry != 0 {
                return Err(FeltError::OutOfRange);
            }
        }
        Self::from_bytes_be(bytes)
    }

    /// Minimal `0x`-prefixed lowercase hex
    #[must_use]
    pub fn to_hex(&self) -> String {
        let Some(first) = self.0.iter().position(|&b| b != 0) else {
            return "0x0".to_string();
        };
        let mut out = format!("0x{:x}", self.0[first]);
        for byte in &self.0[first + 1..] {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    /// The value as a u128
    ///
    /// # Errors
    ///
    /// Returns [`FeltError::DoesNotFit`] if the value needs more than 128 bits.
    pub fn to_u128(&self) -> Result<u128, FeltError> {
        let (high, low) = self.0.split_at(16);
        if high.iter().any(|&b| b != 0) {
            return Err(self.does_not_fit("u128"));
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(low);
        Ok(u128::from_be_bytes(buf))
    }

    /// The value as a u32
    ///
    /// # Errors
    ///
    /// Returns [`FeltError::DoesNotFit`] if the value needs more than 32 bits.
    pub fn to_u32(&self) -> Result<u32, FeltError> {
        let value = self.to_u128()?;
        u32::try_from(value).map_err(|_| self.does_not_fit("u32"))
    }

    /// Packs an ASCII string of at most 31 bytes
    ///
    /// # Errors
    ///
    /// [`FeltError::TooLong`] past 31 bytes, [`FeltError::UnencodableChar`]
    /// for NUL or non-ASCII characters.
    pub fn from_short_string(s: &str) -> Result<Self, FeltError> {
        validate_text(s)?;
        if s.len() > SHORT_STRING_MAX_LEN {
            return Err(FeltError::TooLong { len: s.len() });
        }
        let mut bytes = [0u8; 32];
        bytes[32 - s.len()..].copy_from_slice(s.as_bytes());
        Ok(Self(bytes))
    }

    /// Unpacks a short string
    ///
    /// # Errors
    ///
    /// Returns [`FeltError::UnencodableChar`] if a byte after the leading
    /// zeros is NUL or non-ASCII, or [`FeltError::TooLong`] if the top byte
    /// is set.
    pub fn to_short_string(&self) -> Result<String, FeltError> {
        if self.0[0] != 0 {
            return Err(FeltError::TooLong { len: 32 });
        }
        let start = self.0.iter().position(|&b| b != 0).unwrap_or(32);
        let payload = &self.0[start..];
        if let Some(index) = payload.iter().position(|&b| b == 0 || !b.is_ascii()) {
            return Err(FeltError::UnencodableChar {
                ch: char::from(payload[index]),
                index,
            });
        }
        Ok(payload.iter().map(|&b| char::from(b)).collect())
    }

    fn does_not_fit(&self, target: &'static str) -> FeltError {
        FeltError::DoesNotFit { felt: self.to_hex(), target }
    }
}

impl std::fmt::Debug for Felt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Felt({})", self.to_hex())
    }
}

impl std::fmt::Display for Felt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<u32> for Felt {
    fn from(value: u32) -> Self {
        Self::from_u128(u128::from(value))
    }
}

impl From<Felt> for String {
    fn from(felt: Felt) -> Self {
        felt.to_hex()
    }
}

impl TryFrom<String> for Felt {
    type Error = FeltError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl std::str::FromStr for Felt {
    type Err = FeltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") || s.starts_with("0X") {
            Self::from_hex(s)
        } else {
            Self::from_dec_str(s)
        }
    }
}

/// Rejects characters a short string cannot carry losslessly
///
/// # Errors
///
/// Returns [`FeltError::UnencodableChar`] for the first NUL or non-ASCII
/// character.
pub fn validate_text(s: &str) -> Result<(), FeltError> {
    match s.char_indices().find(|&(_, ch)| ch == '\0' || !ch.is_ascii()) {
        Some((index, ch)) => Err(FeltError::UnencodableChar { ch, index }),
        None => Ok(()),
    }
}

/// Splits `s` left to right into 31-byte short strings
///
/// The last chunk may be shorter; the empty string yields no chunks.
///
/// # Errors
///
/// Returns [`FeltError::UnencodableChar`] for NUL or non-ASCII input.
pub fn split_long_string(s: &str) -> Result<Vec<Felt>, FeltError> {
    validate_text(s)?;
    s.as_bytes()
        .chunks(SHORT_STRING_MAX_LEN)
        .map(|chunk| {
            let mut bytes = [0u8; 32];
            bytes[32 - chunk.len()..].copy_from_slice(chunk);
            Ok(Felt(bytes))
        })
        .collect()
}

/// Decodes each chunk and concatenates them in order
///
/// # Errors
///
/// Returns the first chunk's decoding error.
pub fn join_long_string(chunks: &[Felt]) -> Result<String, FeltError> {
    chunks.iter().map(Felt::to_short_string).collect()
}
