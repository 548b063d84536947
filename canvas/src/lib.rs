//! # Plotgrid Canvas
//!
//! Grid reservation engine for a shared fixed-size canvas. Users drag out a
//! free rectangle of cells, pay a per-cell fee and mint the rectangle as a
//! token carrying a media and a link reference.
//!
//! ## Components
//!
//! - [`plot_index::PlotIndex`]: minted plots and an occupancy mask
//! - [`selection::SelectionEngine`]: drag gesture → candidate rectangle
//! - [`pricing::PricingPolicy`]: cell count → fee
//! - [`calls::CallBuilder`]: `approve` / `mint` / edit payloads
//! - [`reservation::CanvasReducer`]: the approve-then-mint workflow
//! - [`ledger::LedgerClient`]: the ledger boundary, with an in-memory ledger
//!
//! ## Example
//!
//! ```rust,ignore
//! let store = Store::new(
//!     CanvasState::new(config.bounds())?,
//!     CanvasReducer::new(),
//!     CanvasEnvironment::new(ledger, SystemClock, config.settings()?),
//! );
//!
//! store.send(CanvasAction::PointerDown { cell: Cell::new(4, 4) }).await?;
//! store.send(CanvasAction::PointerEnter { cell: Cell::new(5, 6) }).await?;
//! store.send(CanvasAction::PointerUp).await?;
//! store.send(CanvasAction::Submit { media_ref, link_ref }).await?.wait().await;
//! ```

pub mod calls;
pub mod config;
pub mod error;
pub mod felt;
pub mod ledger;
pub mod metadata;
pub mod plot_index;
pub mod pricing;
pub mod reservation;
pub mod selection;
pub mod types;

pub use calls::{Call, CallBuilder};
pub use config::CanvasConfig;
pub use error::{GridError, ReservationError};
pub use felt::Felt;
pub use plot_index::PlotIndex;
pub use pricing::{Amount, PricingPolicy};
pub use reservation::{CanvasAction, CanvasEnvironment, CanvasReducer, CanvasState, Phase};
pub use selection::{SelectionEngine, SelectionState};
pub use types::{Cell, GridBounds, Plot, Rectangle, TokenId};
