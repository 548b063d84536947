//! Token metadata documents served for each plot.

use crate::types::{Plot, TokenId};
use serde::{Deserialize, Serialize};

/// Collection name shown by wallets and marketplaces
pub const COLLECTION_NAME: &str = "Plotgrid Canvas";

/// ERC721 metadata JSON for one plot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Collection name
    pub name: String,
    /// Human-readable description naming the plot position
    pub description: String,
    /// Media reference
    pub image: String,
    /// Link reference
    pub external_url: String,
}

impl TokenMetadata {
    /// Metadata for `plot`
    #[must_use]
    pub fn for_plot(plot: &Plot) -> Self {
        Self {
            name: COLLECTION_NAME.to_string(),
            description: format!(
                "A plot of the {COLLECTION_NAME} located at pos[{},{}]",
                plot.origin.col, plot.origin.row
            ),
            image: plot.media_ref.clone(),
            external_url: plot.link_ref.clone(),
        }
    }
}

/// Token id from a metadata filename such as `12.json`
///
/// Takes the leading decimal digits; `None` if there are none.
#[must_use]
pub fn token_id_from_filename(filename: &str) -> Option<TokenId> {
    let digits: String = filename.chars().take_while(char::is_ascii_digit).collect();
    let value: u128 = digits.parse().ok()?;
    Some(TokenId::from(value))
}
