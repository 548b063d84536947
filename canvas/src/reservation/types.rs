//! Reservation state: the attempt lifecycle and the canvas state it lives in.

use crate::error::{GridError, ReservationError};
use crate::plot_index::PlotIndex;
use crate::pricing::Amount;
use crate::selection::{Quote, SelectionState};
use crate::types::{GridBounds, Rectangle, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one reservation attempt.
///
/// Every ledger result carries the id of the attempt that issued it, so a
/// late result for a cancelled or superseded attempt can be recognized and
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Generate a new attempt ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of a reservation attempt.
///
/// Moves forward only: `Idle → Approving → Approved → Minting → Committed`,
/// or to `Failed` from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Created, nothing submitted
    Idle,
    /// Fee approval submitted
    Approving,
    /// Fee approval confirmed
    Approved,
    /// Mint submitted
    Minting,
    /// Plot minted
    Committed,
    /// Attempt abandoned
    Failed,
}

impl Phase {
    /// `Committed` or `Failed`
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Whether `self → next` is a legal step
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Approving)
                | (Self::Approving, Self::Approved)
                | (Self::Approved, Self::Minting)
                | (Self::Minting, Self::Committed)
                | (Self::Idle | Self::Approving | Self::Approved | Self::Minting, Self::Failed)
        )
    }

    /// Lowercase label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Approving => "approving",
            Self::Approved => "approved",
            Self::Minting => "minting",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Approving => "Approving",
            Self::Approved => "Approved",
            Self::Minting => "Minting",
            Self::Committed => "Committed",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One two-phase commit: fee approval, then mint.
///
/// Rectangle, text and amount are captured at submit time and never re-read
/// from the selection, which may change while calls are in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationAttempt {
    /// Attempt id
    pub id: AttemptId,
    /// Rectangle being reserved
    pub rectangle: Rectangle,
    /// Media reference
    pub media_ref: String,
    /// Link reference
    pub link_ref: String,
    /// Fee approved for the mint
    pub amount: Amount,
    /// Current phase
    pub phase: Phase,
    /// When the attempt was submitted
    pub started_at: DateTime<Utc>,
    /// Token minted, once `Committed`
    pub token_id: Option<TokenId>,
    /// Why the attempt failed, once `Failed`
    pub failure: Option<ReservationError>,
}

impl ReservationAttempt {
    /// New attempt in `Idle` for a confirmed quote
    #[must_use]
    pub fn new(quote: Quote, media_ref: String, link_ref: String, started_at: DateTime<Utc>) -> Self {
        Self {
            id: AttemptId::new(),
            rectangle: quote.rectangle,
            media_ref,
            link_ref,
            amount: quote.amount,
            phase: Phase::Idle,
            started_at,
            token_id: None,
            failure: None,
        }
    }

    /// Moves to `next`
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidTransition`] for any step other than
    /// the next forward phase or `Failed` from a non-terminal phase.
    pub fn advance(&mut self, next: Phase) -> Result<(), ReservationError> {
        if !self.phase.can_advance_to(next) {
            return Err(ReservationError::InvalidTransition { from: self.phase, to: next });
        }
        tracing::debug!(attempt_id = %self.id, from = %self.phase, to = %next, "Attempt phase change");
        self.phase = next;
        Ok(())
    }

    /// Fails the attempt with `error`
    ///
    /// Returns `false` (and changes nothing) if the attempt already ended.
    pub fn fail(&mut self, error: ReservationError) -> bool {
        if self.advance(Phase::Failed).is_err() {
            return false;
        }
        self.failure = Some(error);
        true
    }

    /// Whether the attempt has ended
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether a result for `id` in `phase` belongs to this attempt
    #[must_use]
    pub fn awaits(&self, id: AttemptId, phase: Phase) -> bool {
        self.id == id && self.phase == phase
    }
}

/// Blocking notification for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A reservation, edit or load failed
    Failure(ReservationError),
    /// A plot was minted
    Committed {
        /// New token
        token_id: TokenId,
    },
    /// A plot's media or link was updated
    Edited {
        /// Edited token
        token_id: TokenId,
    },
}

/// Everything the canvas reducer owns
#[derive(Debug, Clone)]
pub struct CanvasState {
    /// Minted plots
    pub plots: PlotIndex,
    /// Drag selection
    pub selection: SelectionState,
    /// Current or last reservation attempt
    pub attempt: Option<ReservationAttempt>,
    /// Notification awaiting dismissal
    pub notice: Option<Notice>,
    /// Tokens held by the connected account
    pub owned: Vec<TokenId>,
    /// Plot whose edit is in flight
    pub pending_edit: Option<TokenId>,
}

impl CanvasState {
    /// Empty canvas over `bounds`
    ///
    /// # Errors
    ///
    /// Returns a [`GridError`] when the grid is too large to index.
    pub fn new(bounds: GridBounds) -> Result<Self, GridError> {
        PlotIndex::new(bounds).map(Self::with_plots)
    }

    /// Canvas over an existing plot set
    #[must_use]
    pub const fn with_plots(plots: PlotIndex) -> Self {
        Self {
            plots,
            selection: SelectionState {
                active: false,
                anchor: None,
                rectangle: None,
                price_quote: None,
            },
            attempt: None,
            notice: None,
            owned: Vec::new(),
            pending_edit: None,
        }
    }

    /// Whether a reservation attempt is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| !a.is_terminal())
    }

    /// Phase of the current attempt, `Idle` if there is none
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.attempt.as_ref().map_or(Phase::Idle, |a| a.phase)
    }
}
