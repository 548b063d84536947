//! Error types for the canvas engine.
//!
//! Ledger transport errors live in [`crate::ledger::LedgerError`] and
//! configuration errors in [`crate::config::ConfigError`]; everything the
//! user can be told about ends up as a [`ReservationError`].

use crate::reservation::Phase;
use crate::types::{Rectangle, TokenId};
use thiserror::Error;

/// Geometry, pricing and plot-index errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A cell lies outside the grid.
    #[error("Cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        /// Row of the offending cell
        row: u32,
        /// Column of the offending cell
        col: u32,
        /// Grid rows
        rows: u32,
        /// Grid columns
        cols: u32,
    },

    /// A rectangle with zero width or height.
    #[error("Rectangle must be at least 1x1, got {width}x{height}")]
    EmptyRectangle {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A rectangle whose far edge is not addressable.
    #[error("Rectangle {width}x{height}@({x}, {y}) extends past the coordinate range")]
    RectangleOverflow {
        /// Leftmost column
        x: u32,
        /// Topmost row
        y: u32,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A grid too large to index.
    #[error("Grid {rows}x{cols} exceeds the limit of {max} cells")]
    GridTooLarge {
        /// Grid rows
        rows: u32,
        /// Grid columns
        cols: u32,
        /// Largest supported cell count
        max: u64,
    },

    /// The occupancy mask could not be allocated.
    #[error("Cannot allocate an index for {cells} cells")]
    IndexAllocation {
        /// Requested cell count
        cells: u64,
    },

    /// A rectangle that does not fit on the grid.
    #[error("Rectangle {rectangle} does not fit on the grid")]
    RectangleOutOfBounds {
        /// The rectangle
        rectangle: Rectangle,
    },

    /// Inserting a plot would cover an occupied cell.
    #[error("Plot {token_id} overlaps plot {existing}")]
    PlotOverlap {
        /// Token being inserted
        token_id: TokenId,
        /// Token already holding the cell
        existing: TokenId,
    },

    /// Pricing requires at least one cell.
    #[error("Cannot price an empty selection")]
    EmptySelection,

    /// `cells * unit_price` does not fit in 128 bits.
    #[error("Price of {cells} cells overflows")]
    PriceOverflow {
        /// Cell count
        cells: u64,
    },
}

/// Errors parsing a decimal amount.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Not a plain non-negative decimal.
    #[error("Invalid decimal amount: {input}")]
    InvalidDecimal {
        /// Input string
        input: String,
    },

    /// More fractional digits than the token has decimals.
    #[error("Amount {input} has more than {decimals} fractional digits")]
    TooPrecise {
        /// Input string
        input: String,
        /// Token decimals
        decimals: u32,
    },

    /// The scaled value does not fit in 128 bits.
    #[error("Amount {input} overflows")]
    Overflow {
        /// Input string
        input: String,
    },
}

/// Errors converting between strings, numbers and field elements.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeltError {
    /// A character that cannot appear in a short string.
    #[error("Character {ch:?} at byte {index} is not printable ASCII")]
    UnencodableChar {
        /// The character
        ch: char,
        /// Its byte offset
        index: usize,
    },

    /// More than 31 bytes for a single short string.
    #[error("Short string of {len} bytes exceeds 31")]
    TooLong {
        /// Byte length
        len: usize,
    },

    /// Value is not below the field prime.
    #[error("Value is outside the field")]
    OutOfRange,

    /// Malformed hex literal.
    #[error("Invalid hex felt: {input}")]
    InvalidHex {
        /// Input string
        input: String,
    },

    /// Malformed decimal literal.
    #[error("Invalid decimal felt: {input}")]
    InvalidNumber {
        /// Input string
        input: String,
    },

    /// Calldata does not have the expected shape.
    #[error("Malformed calldata: {reason}")]
    MalformedCalldata {
        /// What was wrong
        reason: String,
    },

    /// Value does not fit the requested integer type.
    #[error("Felt {felt} does not fit in {target}")]
    DoesNotFit {
        /// Hex rendering of the felt
        felt: String,
        /// Target type name
        target: &'static str,
    },
}

/// User-facing failure categories of a reservation or edit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The selection intersects an existing plot; nothing was sent.
    #[error("Selection {rectangle} overlaps an existing plot")]
    OverlapRejected {
        /// The rejected rectangle
        rectangle: Rectangle,
    },

    /// Someone else minted over the selection after it was priced.
    #[error("Selection {rectangle} was taken before it could be minted")]
    StaleOverlap {
        /// The rejected rectangle
        rectangle: Rectangle,
    },

    /// The fee approval was rejected or errored.
    #[error("Fee approval failed: {reason}")]
    ApprovalFailed {
        /// Ledger message
        reason: String,
    },

    /// The mint was rejected or errored.
    #[error("Mint failed: {reason}")]
    MintFailed {
        /// Ledger message
        reason: String,
    },

    /// No ledger answer within the configured timeout.
    #[error("Ledger call timed out while {phase}")]
    TimedOut {
        /// Phase that was waiting
        phase: Phase,
    },

    /// The user cancelled the attempt.
    #[error("Reservation cancelled")]
    Cancelled,

    /// Another attempt has not finished yet.
    #[error("A reservation is already in progress")]
    AttemptInProgress,

    /// Submit without a confirmed selection.
    #[error("No confirmed selection to reserve")]
    NoSelection,

    /// Media or link text cannot be chunked for the ledger.
    #[error("Invalid {field}: {source}")]
    InvalidText {
        /// `media` or `link`
        field: &'static str,
        /// Encoding failure
        source: FeltError,
    },

    /// Updating a plot's media or link failed.
    #[error("Editing plot {token_id} failed: {reason}")]
    EditFailed {
        /// Plot being edited
        token_id: TokenId,
        /// Ledger message
        reason: String,
    },

    /// Loading plots from the ledger failed.
    #[error("Could not load plots: {reason}")]
    PlotsUnavailable {
        /// Ledger message
        reason: String,
    },

    /// Phase change that would break forward-only ordering.
    #[error("Illegal phase transition {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },

    /// Geometry or pricing failure.
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl ReservationError {
    /// Short, stable label for metrics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OverlapRejected { .. } => "overlap_rejected",
            Self::StaleOverlap { .. } => "stale_overlap",
            Self::ApprovalFailed { .. } => "approval_failed",
            Self::MintFailed { .. } => "mint_failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled => "cancelled",
            Self::AttemptInProgress => "attempt_in_progress",
            Self::NoSelection => "no_selection",
            Self::InvalidText { .. } => "invalid_text",
            Self::EditFailed { .. } => "edit_failed",
            Self::PlotsUnavailable { .. } => "plots_unavailable",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Grid(_) => "grid",
        }
    }
}
