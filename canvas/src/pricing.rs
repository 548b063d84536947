//! Fee amounts and the per-cell pricing policy.

use crate::error::{AmountError, GridError};
use crate::types::Rectangle;
use serde::{Deserialize, Serialize};

/// An amount of the fee token in its smallest unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(pub u128);

impl Amount {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Multiplies by a cell count, `None` on overflow
    #[must_use]
    pub fn checked_mul(self, count: u64) -> Option<Self> {
        self.0.checked_mul(u128::from(count)).map(Self)
    }

    /// Subtracts, `None` on underflow
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Low 128 bits of the u256 ABI form
    #[must_use]
    pub const fn low(self) -> u128 {
        self.0
    }

    /// High 128 bits of the u256 ABI form (always zero for a u128 amount)
    #[must_use]
    pub const fn high(self) -> u128 {
        0
    }

    /// Parses a decimal in whole token units, e.g. `"0.0001"` with 18 decimals
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] for malformed input, more fractional digits
    /// than `decimals`, or a value that does not fit in 128 bits.
    pub fn from_decimal_str(input: &str, decimals: u32) -> Result<Self, AmountError> {
        let invalid = || AmountError::InvalidDecimal { input: input.to_string() };
        let overflow = || AmountError::Overflow { input: input.to_string() };

        let trimmed = input.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let frac = frac.trim_end_matches('0');
        let frac_len = u32::try_from(frac.len()).map_err(|_| invalid())?;
        if frac_len > decimals {
            return Err(AmountError::TooPrecise { input: input.to_string(), decimals });
        }

        let scale = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| overflow())? };
        let frac: u128 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| overflow())? };
        let frac_scale = 10u128.checked_pow(decimals - frac_len).ok_or_else(overflow)?;

        whole
            .checked_mul(scale)
            .and_then(|w| frac.checked_mul(frac_scale).and_then(|f| w.checked_add(f)))
            .map(Self)
            .ok_or_else(overflow)
    }

    /// Renders in whole token units with trailing zeros trimmed
    #[must_use]
    pub fn format_units(self, decimals: u32) -> String {
        let Some(scale) = 10u128.checked_pow(decimals) else {
            return self.0.to_string();
        };
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = decimals as usize);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `cells * unit_price`
///
/// # Errors
///
/// [`GridError::EmptySelection`] for zero cells, [`GridError::PriceOverflow`]
/// if the product does not fit.
pub fn price(cells: u64, unit_price: Amount) -> Result<Amount, GridError> {
    if cells == 0 {
        return Err(GridError::EmptySelection);
    }
    unit_price
        .checked_mul(cells)
        .ok_or(GridError::PriceOverflow { cells })
}

/// Fixed per-cell pricing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    unit_price: Amount,
}

impl PricingPolicy {
    /// Policy charging `unit_price` per cell
    #[must_use]
    pub const fn new(unit_price: Amount) -> Self {
        Self { unit_price }
    }

    /// Configured unit price
    #[must_use]
    pub const fn unit_price(&self) -> Amount {
        self.unit_price
    }

    /// Price of every cell in `rect`
    ///
    /// # Errors
    ///
    /// Returns [`GridError::PriceOverflow`] if the product does not fit.
    pub fn quote(&self, rect: &Rectangle) -> Result<Amount, GridError> {
        price(rect.cell_count(), self.unit_price)
    }
}
