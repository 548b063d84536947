//! Actions processed by the canvas reducer.

use super::types::AttemptId;
use crate::ledger::LedgerError;
use crate::types::{Cell, Plot, TokenId};

/// Canvas action
///
/// Gesture and user actions come from the UI; the rest are produced by
/// ledger effects and fed back into the reducer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasAction {
    // Gestures
    /// Pointer pressed on a cell
    PointerDown {
        /// Cell under the pointer
        cell: Cell,
    },
    /// Pointer dragged onto a cell
    PointerEnter {
        /// Cell under the pointer
        cell: Cell,
    },
    /// Pointer released
    PointerUp,
    /// Discard the selection
    CancelSelection,

    // Reservation workflow
    /// Reserve the confirmed selection
    Submit {
        /// Media reference
        media_ref: String,
        /// Link reference
        link_ref: String,
    },
    /// Fee approval accepted
    ApprovalConfirmed {
        /// Issuing attempt
        attempt_id: AttemptId,
    },
    /// Fee approval rejected, errored or timed out
    ApprovalFailed {
        /// Issuing attempt
        attempt_id: AttemptId,
        /// Ledger error
        error: LedgerError,
    },
    /// Ready to build the mint call
    MintReady {
        /// Issuing attempt
        attempt_id: AttemptId,
        /// Fresh plot snapshot, if one was fetched
        snapshot: Option<Vec<Plot>>,
    },
    /// Mint accepted
    MintConfirmed {
        /// Issuing attempt
        attempt_id: AttemptId,
        /// Token returned by the ledger
        token_id: TokenId,
    },
    /// Mint rejected, errored or timed out
    MintFailed {
        /// Issuing attempt
        attempt_id: AttemptId,
        /// Ledger error
        error: LedgerError,
    },
    /// Stop reacting to the current attempt
    CancelAttempt,

    // Plot set
    /// Reload every plot from the ledger
    RefreshPlots,
    /// Ledger snapshot arrived
    PlotsLoaded {
        /// Every plot
        plots: Vec<Plot>,
    },
    /// Ledger snapshot failed
    PlotsLoadFailed {
        /// Error message
        reason: String,
    },
    /// Load the plots of the connected account
    LoadOwnedPlots,
    /// Plots of the connected account arrived
    OwnedPlotsLoaded {
        /// Owned plots
        plots: Vec<Plot>,
    },

    // Editing
    /// Replace a plot's media and/or link; empty fields are kept
    EditPlot {
        /// Plot to edit
        token_id: TokenId,
        /// New media reference
        media_ref: String,
        /// New link reference
        link_ref: String,
    },
    /// Edit accepted
    EditConfirmed {
        /// Edited plot
        token_id: TokenId,
    },
    /// Edit rejected or errored
    EditFailed {
        /// Plot being edited
        token_id: TokenId,
        /// Error message
        reason: String,
    },

    /// Clear the current notice
    DismissNotice,
}
