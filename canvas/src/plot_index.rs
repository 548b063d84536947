//! Occupancy index over the minted plots.
//!
//! Overlap checks run on every pointer move during a drag, so the index keeps
//! a row-major `rows × cols` mask mapping each cell to the plot holding it.
//! A cell query is one array read; a rectangle query reads only the cells of
//! the rectangle that lie on the grid.

use crate::error::GridError;
use crate::types::{Cell, GridBounds, Plot, Rectangle, TokenId};
use std::collections::HashMap;

/// The set of minted plots and the cells they occupy
///
/// No two plots share a cell: [`PlotIndex::add`] refuses an overlapping
/// plot, and [`PlotIndex::from_plots`] drops later plots that conflict with
/// earlier ones.
#[derive(Clone, Debug)]
pub struct PlotIndex {
    bounds: GridBounds,
    plots: Vec<Plot>,
    /// Index into `plots` for each occupied cell
    mask: Vec<Option<u32>>,
    by_token: HashMap<TokenId, usize>,
}

impl PlotIndex {
    /// Empty index over `bounds`
    ///
    /// # Errors
    ///
    /// - [`GridError::GridTooLarge`]: more than [`GridBounds::MAX_CELLS`] cells
    /// - [`GridError::IndexAllocation`]: the mask could not be allocated
    pub fn new(bounds: GridBounds) -> Result<Self, GridError> {
        bounds.check_size()?;
        let cells = bounds.cell_count();
        let size = usize::try_from(cells).map_err(|_| GridError::IndexAllocation { cells })?;

        let mut mask = Vec::new();
        mask.try_reserve_exact(size)
            .map_err(|_| GridError::IndexAllocation { cells })?;
        mask.resize(size, None);

        Ok(Self {
            bounds,
            plots: Vec::new(),
            mask,
            by_token: HashMap::new(),
        })
    }

    /// Builds an index from a ledger snapshot
    ///
    /// Plots that are malformed, off-grid or overlap an earlier plot are
    /// skipped with a warning; the result always satisfies the no-overlap
    /// invariant.
    ///
    /// # Errors
    ///
    /// Fails like [`PlotIndex::new`] when the grid cannot be indexed.
    pub fn from_plots(bounds: GridBounds, plots: impl IntoIterator<Item = Plot>) -> Result<Self, GridError> {
        let mut index = Self::new(bounds)?;
        index.replace_all(plots);
        Ok(index)
    }

    /// Swaps the contents for a fresh snapshot, reusing the mask
    ///
    /// Conflicting plots are skipped as in [`PlotIndex::from_plots`].
    pub fn replace_all(&mut self, plots: impl IntoIterator<Item = Plot>) {
        self.mask.fill(None);
        self.plots.clear();
        self.by_token.clear();
        for plot in plots {
            let token_id = plot.token_id.clone();
            if let Err(error) = self.add(plot) {
                tracing::warn!(%token_id, %error, "Skipping plot from snapshot");
            }
        }
    }

    /// Grid bounds the index covers
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// Whether any plot covers `cell`; off-grid cells are never occupied
    #[must_use]
    pub fn occupies(&self, cell: Cell) -> bool {
        self.plot_at(cell).is_some()
    }

    /// The plot covering `cell`, if any
    #[must_use]
    pub fn plot_at(&self, cell: Cell) -> Option<&Plot> {
        if !self.bounds.contains(cell) {
            return None;
        }
        let slot = self.mask.get(self.bounds.offset(cell)).copied().flatten()?;
        self.plots.get(slot as usize)
    }

    /// Whether any cell of `rect` is occupied
    #[must_use]
    pub fn overlaps(&self, rect: &Rectangle) -> bool {
        self.first_conflict(rect).is_some()
    }

    /// Looks up a plot by token id
    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<&Plot> {
        self.by_token.get(token_id).and_then(|&i| self.plots.get(i))
    }

    /// Whether a plot with this token id is present
    #[must_use]
    pub fn contains(&self, token_id: &TokenId) -> bool {
        self.by_token.contains_key(token_id)
    }

    /// Adds a plot, idempotent by token id
    ///
    /// Returns `Ok(true)` if the plot was inserted and `Ok(false)` if a plot
    /// with the same token id was already present (the index is unchanged).
    ///
    /// # Errors
    ///
    /// - [`GridError::EmptyRectangle`]: zero width or height
    /// - [`GridError::RectangleOutOfBounds`]: the plot does not fit the grid
    /// - [`GridError::PlotOverlap`]: a cell is already held by another plot
    pub fn add(&mut self, plot: Plot) -> Result<bool, GridError> {
        if self.by_token.contains_key(&plot.token_id) {
            return Ok(false);
        }

        let rect = plot.rectangle()?;
        if !self.bounds.contains_rect(&rect) {
            return Err(GridError::RectangleOutOfBounds { rectangle: rect });
        }
        if let Some(existing) = self.first_conflict(&rect) {
            return Err(GridError::PlotOverlap {
                token_id: plot.token_id,
                existing: existing.token_id.clone(),
            });
        }

        let slot = self.plots.len();
        let tag = u32::try_from(slot).map_err(|_| GridError::RectangleOutOfBounds { rectangle: rect })?;
        for cell in rect.cells() {
            let offset = self.bounds.offset(cell);
            if let Some(entry) = self.mask.get_mut(offset) {
                *entry = Some(tag);
            }
        }
        self.by_token.insert(plot.token_id.clone(), slot);
        self.plots.push(plot);
        Ok(true)
    }

    /// Every plot, in insertion order
    #[must_use]
    pub fn all(&self) -> &[Plot] {
        &self.plots
    }

    /// Number of plots
    #[must_use]
    pub fn len(&self) -> usize {
        self.plots.len()
    }

    /// Whether there are no plots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Number of occupied cells
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.mask.iter().filter(|slot| slot.is_some()).count()
    }

    fn first_conflict(&self, rect: &Rectangle) -> Option<&Plot> {
        // Clip to the grid: off-grid cells can never be occupied
        let right = rect.right().min(u64::from(self.bounds.cols));
        let bottom = rect.bottom().min(u64::from(self.bounds.rows));
        let (x, y) = (u64::from(rect.x()), u64::from(rect.y()));
        if x >= right || y >= bottom {
            return None;
        }

        let cols = self.bounds.cols as usize;
        for row in y..bottom {
            let start = row as usize * cols + x as usize;
            let end = row as usize * cols + right as usize;
            let hit = self
                .mask
                .get(start..end)
                .and_then(|slots| slots.iter().find_map(|slot| *slot));
            if let Some(slot) = hit {
                return self.plots.get(slot as usize);
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn plot(id: u128, x: u32, y: u32, width: u32, height: u32) -> Plot {
        Plot::minted(
            TokenId::from(id),
            Rectangle::new(x, y, width, height).unwrap(),
            format!("https://img/{id}"),
            format!("https://link/{id}"),
        )
    }

    #[test]
    fn test_occupies_marks_every_cell_of_a_plot() {
        let index = PlotIndex::from_plots(GridBounds::default(), [plot(1, 0, 0, 2, 2)]).unwrap();

        assert!(index.occupies(Cell::new(0, 0)));
        assert!(index.occupies(Cell::new(1, 1)));
        assert!(!index.occupies(Cell::new(2, 0)));
        assert!(!index.occupies(Cell::new(0, 2)));
        assert_eq!(index.occupied_cells(), 4);
    }

    #[test]
    fn test_overlap_by_one_cell_is_detected() {
        let index = PlotIndex::from_plots(GridBounds::default(), [plot(1, 0, 0, 2, 2)]).unwrap();

        assert!(index.overlaps(&Rectangle::new(1, 1, 2, 2).unwrap()));
        assert!(!index.overlaps(&Rectangle::new(2, 0, 2, 2).unwrap()));
        assert!(!index.overlaps(&Rectangle::new(0, 2, 5, 1).unwrap()));
    }

    #[test]
    fn test_add_is_idempotent_by_token_id() {
        let mut index = PlotIndex::new(GridBounds::default()).unwrap();
        assert!(index.add(plot(7, 5, 5, 1, 1)).unwrap());
        assert!(!index.add(plot(7, 5, 5, 1, 1)).unwrap());
        // Same id at another position is still treated as already present
        assert!(!index.add(plot(7, 50, 50, 1, 1)).unwrap());
        assert_eq!(index.len(), 1);
        assert!(!index.occupies(Cell::new(50, 50)));
    }

    #[test]
    fn test_add_rejects_overlap_and_leaves_index_untouched() {
        let mut index = PlotIndex::from_plots(GridBounds::default(), [plot(1, 0, 0, 2, 2)]).unwrap();

        let err = index.add(plot(2, 1, 1, 3, 3)).unwrap_err();
        assert_eq!(
            err,
            GridError::PlotOverlap { token_id: TokenId::from(2), existing: TokenId::from(1) }
        );
        assert_eq!(index.len(), 1);
        assert!(!index.occupies(Cell::new(3, 3)));
    }

    #[test]
    fn test_add_rejects_off_grid_plot() {
        let mut index = PlotIndex::new(GridBounds::new(10, 10)).unwrap();
        assert!(matches!(
            index.add(plot(1, 9, 9, 2, 1)),
            Err(GridError::RectangleOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_from_plots_skips_conflicting_entries() {
        let index = PlotIndex::from_plots(
            GridBounds::default(),
            [plot(1, 0, 0, 2, 2), plot(2, 1, 1, 2, 2), plot(3, 4, 4, 1, 1)],
        )
        .unwrap();
        let ids: Vec<_> = index.all().iter().map(|p| p.token_id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_overlap_query_is_clipped_to_grid() {
        let index = PlotIndex::from_plots(GridBounds::new(4, 4), [plot(1, 3, 3, 1, 1)]).unwrap();
        assert!(index.overlaps(&Rectangle::new(2, 2, 100, 100).unwrap()));
        assert!(!index.overlaps(&Rectangle::new(10, 10, 2, 2).unwrap()));
        assert!(!index.occupies(Cell::new(40, 0)));
    }

    #[test]
    fn test_lookup_by_cell_and_token() {
        let index = PlotIndex::from_plots(GridBounds::default(), [plot(3, 10, 20, 3, 1)]).unwrap();
        let by_cell = index.plot_at(Cell::new(20, 12)).unwrap();
        assert_eq!(by_cell.token_id, TokenId::from(3));
        assert_eq!(index.get(&TokenId::from(3)), Some(by_cell));
        assert!(index.get(&TokenId::from(4)).is_none());
    }

    #[test]
    fn test_oversized_grid_is_refused_without_allocating() {
        let err = PlotIndex::new(GridBounds::new(u32::MAX, u32::MAX)).unwrap_err();
        assert_eq!(
            err,
            GridError::GridTooLarge { rows: u32::MAX, cols: u32::MAX, max: GridBounds::MAX_CELLS }
        );
        assert!(PlotIndex::from_plots(GridBounds::new(100_000, 100_000), Vec::new()).is_err());
        assert!(PlotIndex::new(GridBounds::new(2048, 2048)).is_ok());
    }

    #[test]
    fn test_replace_all_drops_previous_plots() {
        let mut index = PlotIndex::from_plots(GridBounds::default(), [plot(1, 0, 0, 2, 2)]).unwrap();
        index.replace_all([plot(2, 1, 1, 1, 1), plot(3, 5, 5, 1, 1)]);

        assert!(!index.contains(&TokenId::from(1)));
        assert!(!index.occupies(Cell::new(0, 0)));
        assert_eq!(index.plot_at(Cell::new(1, 1)).map(|p| p.token_id.clone()), Some(TokenId::from(2)));
        assert_eq!(index.len(), 2);
        assert_eq!(index.occupied_cells(), 2);
    }
}
