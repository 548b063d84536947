//! Reservation workflow.
//!
//! One reducer owns the whole canvas interaction:
//!
//! ```text
//! PointerDown / PointerEnter / PointerUp
//!         ↓
//! SelectionEngine ── overlap? ──→ OverlapRejected (no ledger call)
//!         ↓ priced quote
//! Submit ──→ Approving ── approve(spender, low, high) ──→ Approved
//!                                                         ↓
//!                                   fresh snapshot ── overlap? ──→ Failed (StaleOverlap)
//!                                                         ↓
//!                                   Minting ── mint(x, y, w, h, media, link) ──→ Committed
//! ```
//!
//! Any ledger error or timeout moves the attempt to `Failed`; nothing is
//! retried and an approval that succeeded is not rolled back. A new submit
//! is refused until the current attempt is `Committed` or `Failed`.

pub mod actions;
pub mod environment;
pub mod reducer;
#[cfg(test)]
mod tests;
pub mod types;

pub use actions::CanvasAction;
pub use environment::{CanvasEnvironment, ReservationSettings};
pub use reducer::CanvasReducer;
pub use types::{AttemptId, CanvasState, Notice, Phase, ReservationAttempt};
