//! Configuration for the canvas engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::calls::CallBuilder;
use crate::error::{AmountError, FeltError};
use crate::felt::Felt;
use crate::pricing::Amount;
use crate::reservation::ReservationSettings;
use crate::types::GridBounds;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// ETH fee token on Starknet
pub const DEFAULT_FEE_TOKEN_ADDRESS: &str =
    "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";

/// Canvas ERC721 contract
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x05eefcf9148636f2f0f3b7969e7d0107809ee05201ecbbd69335c40bd031de75";

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Rows or columns is zero
    #[error("Grid bounds must be non-zero, got {rows}x{cols}")]
    InvalidBounds {
        /// Rows
        rows: u32,
        /// Columns
        cols: u32,
    },

    /// The grid has more cells than the index supports
    #[error("Grid {rows}x{cols} exceeds the limit of {max} cells")]
    GridTooLarge {
        /// Rows
        rows: u32,
        /// Columns
        cols: u32,
        /// Largest supported cell count
        max: u64,
    },

    /// Unit price does not parse
    #[error("Invalid unit price: {0}")]
    InvalidUnitPrice(#[from] AmountError),

    /// Unit price is zero
    #[error("Unit price must be greater than zero")]
    ZeroUnitPrice,

    /// An address is not a field element
    #[error("Invalid {key}: {source}")]
    InvalidAddress {
        /// Environment variable
        key: &'static str,
        /// Parse failure
        source: FeltError,
    },
}

/// Canvas configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Grid size
    pub grid: GridConfig,
    /// Fee token and pricing
    pub fees: FeeConfig,
    /// Ledger endpoints and call policy
    pub ledger: LedgerConfig,
    /// Prometheus listener, if metrics are enabled
    pub metrics_addr: Option<SocketAddr>,
}

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of rows
    pub rows: u32,
    /// Number of columns
    pub cols: u32,
}

/// Fee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Price per cell in whole fee-token units (decimal string)
    pub unit_price: String,
    /// Fee token decimals
    pub decimals: u32,
    /// Fee token contract address
    pub fee_token_address: String,
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Canvas contract address (mint target and allowance spender)
    pub contract_address: String,
    /// Connected account address
    pub account_address: Option<String>,
    /// Timeout per ledger call in seconds; 0 disables
    pub timeout_secs: u64,
    /// Fetch a fresh plot snapshot before each mint
    pub refresh_before_mint: bool,
}

impl CanvasConfig {
    /// Load configuration from environment variables.
    ///
    /// Uses default values if environment variables are not set or do not
    /// parse.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            grid: GridConfig {
                rows: parse_env("CANVAS_ROWS", 100),
                cols: parse_env("CANVAS_COLS", 100),
            },
            fees: FeeConfig {
                unit_price: env::var("CANVAS_UNIT_PRICE").unwrap_or_else(|_| "0.0001".to_string()),
                decimals: parse_env("CANVAS_FEE_TOKEN_DECIMALS", 18),
                fee_token_address: env::var("CANVAS_FEE_TOKEN_ADDRESS")
                    .unwrap_or_else(|_| DEFAULT_FEE_TOKEN_ADDRESS.to_string()),
            },
            ledger: LedgerConfig {
                contract_address: env::var("CANVAS_CONTRACT_ADDRESS")
                    .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string()),
                account_address: env::var("CANVAS_ACCOUNT_ADDRESS").ok().filter(|s| !s.is_empty()),
                timeout_secs: parse_env("CANVAS_LEDGER_TIMEOUT_SECS", 120),
                refresh_before_mint: parse_env("CANVAS_REFRESH_BEFORE_MINT", true),
            },
            metrics_addr: env::var("CANVAS_METRICS_ADDR").ok().and_then(|v| v.parse().ok()),
        }
    }

    /// Grid bounds
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        GridBounds::new(self.grid.rows, self.grid.cols)
    }

    /// Unit price in the fee token's smallest unit
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the price does not parse or is zero.
    pub fn unit_price(&self) -> Result<Amount, ConfigError> {
        let price = Amount::from_decimal_str(&self.fees.unit_price, self.fees.decimals)?;
        if price == Amount::ZERO {
            return Err(ConfigError::ZeroUnitPrice);
        }
        Ok(price)
    }

    /// Ledger call timeout, `None` when disabled
    #[must_use]
    pub const fn ledger_timeout(&self) -> Option<Duration> {
        if self.ledger.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.ledger.timeout_secs))
        }
    }

    /// Checks every value the engine depends on
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings().map(|_| ())
    }

    /// Reservation settings for the canvas environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero or oversized bounds, an invalid or
    /// zero unit price, or an address that is not a field element.
    pub fn settings(&self) -> Result<ReservationSettings, ConfigError> {
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(ConfigError::InvalidBounds { rows: self.grid.rows, cols: self.grid.cols });
        }
        if self.bounds().check_size().is_err() {
            return Err(ConfigError::GridTooLarge {
                rows: self.grid.rows,
                cols: self.grid.cols,
                max: GridBounds::MAX_CELLS,
            });
        }
        let unit_price = self.unit_price()?;
        let fee_token = address("CANVAS_FEE_TOKEN_ADDRESS", &self.fees.fee_token_address)?;
        let contract = address("CANVAS_CONTRACT_ADDRESS", &self.ledger.contract_address)?;

        let mut settings = ReservationSettings::new(self.bounds(), unit_price, CallBuilder::new(fee_token, contract))
            .with_ledger_timeout(self.ledger_timeout())
            .with_refresh_before_mint(self.ledger.refresh_before_mint);
        if let Some(account) = &self.ledger.account_address {
            settings = settings.with_account(address("CANVAS_ACCOUNT_ADDRESS", account)?);
        }
        Ok(settings)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig { rows: 100, cols: 100 },
            fees: FeeConfig {
                unit_price: "0.0001".to_string(),
                decimals: 18,
                fee_token_address: DEFAULT_FEE_TOKEN_ADDRESS.to_string(),
            },
            ledger: LedgerConfig {
                contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
                account_address: None,
                timeout_secs: 120,
                refresh_before_mint: true,
            },
            metrics_addr: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn address(key: &'static str, value: &str) -> Result<Felt, ConfigError> {
    Felt::from_hex(value).map_err(|source| ConfigError::InvalidAddress { key, source })
}
