//! Drag-to-select gesture.
//!
//! The anchor is fixed when the drag starts; every pointer move recomputes the
//! bounding box of anchor and pointer from scratch, so replaying the same
//! final cell always gives the same rectangle and price.

use crate::error::ReservationError;
use crate::plot_index::PlotIndex;
use crate::pricing::{Amount, PricingPolicy};
use crate::types::{Cell, Rectangle};
use serde::{Deserialize, Serialize};

/// A priced rectangle ready for confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Selected cells
    pub rectangle: Rectangle,
    /// `cells * unit_price`
    pub amount: Amount,
}

/// In-progress or confirmed selection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    /// A drag is in progress
    pub active: bool,
    /// Cell where the drag started
    pub anchor: Option<Cell>,
    /// Current candidate rectangle
    pub rectangle: Option<Rectangle>,
    /// Price of `rectangle`
    pub price_quote: Option<Amount>,
}

impl SelectionState {
    /// Whether nothing is selected
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rectangle.is_none()
    }

    /// The quote awaiting confirmation, once the drag has ended
    #[must_use]
    pub fn confirmed(&self) -> Option<Quote> {
        if self.active {
            return None;
        }
        Some(Quote {
            rectangle: self.rectangle?,
            amount: self.price_quote?,
        })
    }

    /// Cells in the current rectangle
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        self.rectangle.map_or(0, |r| r.cell_count())
    }

    /// Forget everything
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Result of releasing the pointer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// No drag was in progress
    Inactive,
    /// The rectangle is free; show it for confirmation
    Confirm(Quote),
    /// The selection was discarded
    Rejected(ReservationError),
}

/// Drives [`SelectionState`] from pointer events
///
/// Reads the [`PlotIndex`] to validate, never mutates it.
#[derive(Clone, Copy, Debug)]
pub struct SelectionEngine {
    pricing: PricingPolicy,
}

impl SelectionEngine {
    /// Engine pricing selections with `pricing`
    #[must_use]
    pub const fn new(pricing: PricingPolicy) -> Self {
        Self { pricing }
    }

    /// Pricing policy in use
    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// Starts a drag at `cell`
    ///
    /// Does nothing if the cell is occupied or off the grid.
    pub fn begin_selection(&self, state: &mut SelectionState, plots: &PlotIndex, cell: Cell) {
        if !plots.bounds().contains(cell) || plots.occupies(cell) {
            tracing::trace!(%cell, "Ignoring drag start on unavailable cell");
            return;
        }

        let rectangle = Rectangle::single(cell);
        state.active = true;
        state.anchor = Some(cell);
        state.rectangle = Some(rectangle);
        state.price_quote = self.quote(&rectangle);
    }

    /// Moves the free corner of the drag to `cell`
    ///
    /// No-op without an active drag. Off-grid cells are clamped to the edge.
    pub fn extend_selection(&self, state: &mut SelectionState, plots: &PlotIndex, cell: Cell) {
        if !state.active {
            return;
        }
        let Some(anchor) = state.anchor else {
            return;
        };

        let bounds = plots.bounds();
        let clamped = Cell::new(
            cell.row.min(bounds.rows.saturating_sub(1)),
            cell.col.min(bounds.cols.saturating_sub(1)),
        );
        let rectangle = Rectangle::from_corners(anchor, clamped);
        state.rectangle = Some(rectangle);
        state.price_quote = self.quote(&rectangle);
    }

    /// Releases the pointer
    ///
    /// An overlapping rectangle clears the selection and is reported as
    /// [`ReservationError::OverlapRejected`]; it never reaches the ledger.
    pub fn end_selection(&self, state: &mut SelectionState, plots: &PlotIndex) -> SelectionOutcome {
        if !state.active {
            return SelectionOutcome::Inactive;
        }
        let Some(rectangle) = state.rectangle else {
            state.clear();
            return SelectionOutcome::Inactive;
        };

        if plots.overlaps(&rectangle) {
            state.clear();
            return SelectionOutcome::Rejected(ReservationError::OverlapRejected { rectangle });
        }

        let amount = match self.pricing.quote(&rectangle) {
            Ok(amount) => amount,
            Err(error) => {
                state.clear();
                return SelectionOutcome::Rejected(error.into());
            },
        };

        state.active = false;
        state.price_quote = Some(amount);
        SelectionOutcome::Confirm(Quote { rectangle, amount })
    }

    /// Clears the selection from any state
    pub fn cancel_selection(&self, state: &mut SelectionState) {
        state.clear();
    }

    fn quote(&self, rectangle: &Rectangle) -> Option<Amount> {
        match self.pricing.quote(rectangle) {
            Ok(amount) => Some(amount),
            Err(error) => {
                tracing::warn!(%rectangle, %error, "Selection cannot be priced");
                None
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{GridBounds, Plot, TokenId};

    fn engine() -> SelectionEngine {
        SelectionEngine::new(PricingPolicy::new(Amount(10)))
    }

    fn index_with_origin_plot() -> PlotIndex {
        PlotIndex::from_plots(
            GridBounds::default(),
            [Plot::minted(
                TokenId::from(1),
                Rectangle::new(0, 0, 2, 2).unwrap(),
                String::new(),
                String::new(),
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_begin_on_free_cell_selects_one_cell() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();

        engine().begin_selection(&mut state, &plots, Cell::new(5, 7));

        assert!(state.active);
        assert_eq!(state.anchor, Some(Cell::new(5, 7)));
        assert_eq!(state.rectangle, Some(Rectangle::new(7, 5, 1, 1).unwrap()));
        assert_eq!(state.price_quote, Some(Amount(10)));
    }

    #[test]
    fn test_begin_on_occupied_cell_is_ignored() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();

        engine().begin_selection(&mut state, &plots, Cell::new(1, 1));
        assert_eq!(state, SelectionState::default());

        engine().begin_selection(&mut state, &plots, Cell::new(100, 0));
        assert_eq!(state, SelectionState::default());
    }

    #[test]
    fn test_extend_reprices_from_anchor() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        let engine = engine();

        engine.begin_selection(&mut state, &plots, Cell::new(10, 10));
        engine.extend_selection(&mut state, &plots, Cell::new(11, 12));
        assert_eq!(state.rectangle, Some(Rectangle::new(10, 10, 3, 2).unwrap()));
        assert_eq!(state.price_quote, Some(Amount(60)));

        // Shrinking back recomputes from the anchor, not from the old box
        engine.extend_selection(&mut state, &plots, Cell::new(10, 11));
        assert_eq!(state.rectangle, Some(Rectangle::new(10, 10, 2, 1).unwrap()));
        assert_eq!(state.price_quote, Some(Amount(20)));
    }

    #[test]
    fn test_extend_without_drag_is_noop() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        engine().extend_selection(&mut state, &plots, Cell::new(3, 3));
        assert!(state.is_empty());
    }

    #[test]
    fn test_extend_clamps_to_grid() {
        let plots = PlotIndex::new(GridBounds::new(10, 10)).unwrap();
        let mut state = SelectionState::default();
        let engine = engine();

        engine.begin_selection(&mut state, &plots, Cell::new(8, 8));
        engine.extend_selection(&mut state, &plots, Cell::new(50, 50));
        assert_eq!(state.rectangle, Some(Rectangle::new(8, 8, 2, 2).unwrap()));
    }

    #[test]
    fn test_end_over_existing_plot_rejects_and_clears() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        let engine = engine();

        engine.begin_selection(&mut state, &plots, Cell::new(2, 2));
        engine.extend_selection(&mut state, &plots, Cell::new(1, 1));
        let outcome = engine.end_selection(&mut state, &plots);

        assert_eq!(
            outcome,
            SelectionOutcome::Rejected(ReservationError::OverlapRejected {
                rectangle: Rectangle::new(1, 1, 2, 2).unwrap()
            })
        );
        assert_eq!(state, SelectionState::default());
    }

    #[test]
    fn test_end_on_free_rectangle_confirms() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        let engine = engine();

        engine.begin_selection(&mut state, &plots, Cell::new(4, 4));
        engine.extend_selection(&mut state, &plots, Cell::new(5, 6));
        let outcome = engine.end_selection(&mut state, &plots);

        let quote = Quote { rectangle: Rectangle::new(4, 4, 3, 2).unwrap(), amount: Amount(60) };
        assert_eq!(outcome, SelectionOutcome::Confirm(quote));
        assert!(!state.active);
        assert_eq!(state.confirmed(), Some(quote));
    }

    #[test]
    fn test_end_without_drag_is_inactive() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        assert_eq!(engine().end_selection(&mut state, &plots), SelectionOutcome::Inactive);
    }

    #[test]
    fn test_cancel_clears_mid_drag() {
        let plots = index_with_origin_plot();
        let mut state = SelectionState::default();
        let engine = engine();

        engine.begin_selection(&mut state, &plots, Cell::new(4, 4));
        engine.cancel_selection(&mut state);
        assert_eq!(state, SelectionState::default());
        assert!(state.confirmed().is_none());
    }
}
