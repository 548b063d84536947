//! Grid geometry and plot records.
//!
//! Two coordinate frames meet here. Gestures speak in cells (`row`, `col`);
//! the ledger speaks in `(x, y, width, height)` where `x` is the column and
//! `y` the row. [`Rectangle`] is the only place the two are converted.

use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// One grid unit at `(row, col)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Row index, `0 <= row < rows`
    pub row: u32,
    /// Column index, `0 <= col < cols`
    pub col: u32,
}

impl Cell {
    /// Creates a cell at `(row, col)`
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Fixed size of the canvas
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Number of rows (R)
    pub rows: u32,
    /// Number of columns (C)
    pub cols: u32,
}

impl GridBounds {
    /// Largest grid an index will allocate an occupancy mask for
    pub const MAX_CELLS: u64 = 1 << 22;

    /// Creates bounds of `rows × cols`
    #[must_use]
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Checks the grid fits under [`GridBounds::MAX_CELLS`]
    ///
    /// # Errors
    ///
    /// Returns [`GridError::GridTooLarge`] for oversized grids.
    pub const fn check_size(&self) -> Result<(), GridError> {
        if self.cell_count() > Self::MAX_CELLS {
            return Err(GridError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
                max: Self::MAX_CELLS,
            });
        }
        Ok(())
    }

    /// Total number of cells
    #[must_use]
    pub const fn cell_count(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// Whether the cell lies on the grid
    #[must_use]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Whether every cell of the rectangle lies on the grid
    #[must_use]
    pub const fn contains_rect(&self, rect: &Rectangle) -> bool {
        rect.right() <= self.cols as u64 && rect.bottom() <= self.rows as u64
    }

    /// Row-major position of a cell in a mask sized `rows × cols`
    ///
    /// Callers must check [`GridBounds::contains`] first.
    #[must_use]
    pub(crate) const fn offset(&self, cell: Cell) -> usize {
        cell.row as usize * self.cols as usize + cell.col as usize
    }

    pub(crate) fn check(&self, cell: Cell) -> Result<(), GridError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(GridError::OutOfBounds {
                row: cell.row,
                col: cell.col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

/// Axis-aligned rectangle of cells in ledger order `(x, y, width, height)`
///
/// `x` is the leftmost column, `y` the topmost row. Width and height are
/// always at least 1, and the far edge cell is addressable as a `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RectangleParts")]
pub struct Rectangle {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Rectangle {
    /// Inclusive bounding box of two corner cells
    #[must_use]
    pub fn from_corners(a: Cell, b: Cell) -> Self {
        Self {
            x: a.col.min(b.col),
            y: a.row.min(b.row),
            width: a.col.abs_diff(b.col).saturating_add(1),
            height: a.row.abs_diff(b.row).saturating_add(1),
        }
    }

    /// A 1×1 rectangle covering exactly `cell`
    #[must_use]
    pub const fn single(cell: Cell) -> Self {
        Self {
            x: cell.col,
            y: cell.row,
            width: 1,
            height: 1,
        }
    }

    /// Rectangle from explicit ledger coordinates
    ///
    /// # Errors
    ///
    /// - [`GridError::EmptyRectangle`]: width or height is zero
    /// - [`GridError::RectangleOverflow`]: the far edge lies past `u32::MAX`
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyRectangle { width, height });
        }
        if x.checked_add(width - 1).is_none() || y.checked_add(height - 1).is_none() {
            return Err(GridError::RectangleOverflow { x, y, width, height });
        }
        Ok(Self { x, y, width, height })
    }

    /// Leftmost column
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Topmost row
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Width in cells
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Top-left cell
    #[must_use]
    pub const fn origin(&self) -> Cell {
        Cell::new(self.y, self.x)
    }

    /// One past the rightmost column
    #[must_use]
    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// One past the bottom row
    #[must_use]
    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Number of cells covered
    #[must_use]
    pub const fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the rectangle covers `cell`
    #[must_use]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.col >= self.x
            && (cell.col as u64) < self.right()
            && cell.row >= self.y
            && (cell.row as u64) < self.bottom()
    }

    /// Whether the two rectangles share at least one cell
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }

    /// Cells in row-major order
    ///
    /// Every constructor keeps `x + width - 1` and `y + height - 1` within
    /// `u32`, so the offsets cannot overflow.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let (x, y) = (self.x, self.y);
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |dr| (0..w).map(move |dc| Cell::new(y + dr, x + dc)))
    }
}

#[derive(Deserialize)]
struct RectangleParts {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl TryFrom<RectangleParts> for Rectangle {
    type Error = GridError;

    fn try_from(parts: RectangleParts) -> Result<Self, Self::Error> {
        Self::new(parts.x, parts.y, parts.width, parts.height)
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}@({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// Ledger token identifier, rendered in decimal
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Creates a token id from its decimal rendering
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the decimal rendering
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, if the id is a decimal that fits in 128 bits
    #[must_use]
    pub fn as_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }
}

impl From<u128> for TokenId {
    fn from(value: u128) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A minted rectangular reservation
///
/// Created only from a confirmed mint or a ledger read; never edited in
/// place. A media/link update on the ledger shows up as a new `Plot` after
/// the next refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    /// Ledger token id
    pub token_id: TokenId,
    /// Top-left cell
    pub origin: Cell,
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Media reference (usually an image URL)
    pub media_ref: String,
    /// Link reference
    pub link_ref: String,
}

impl Plot {
    /// Builds the plot a successful mint of `rect` produces
    #[must_use]
    pub fn minted(token_id: TokenId, rect: Rectangle, media_ref: String, link_ref: String) -> Self {
        Self {
            token_id,
            origin: rect.origin(),
            width: rect.width(),
            height: rect.height(),
            media_ref,
            link_ref,
        }
    }

    /// The rectangle this plot covers
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyRectangle`] for a degenerate plot.
    pub const fn rectangle(&self) -> Result<Rectangle, GridError> {
        Rectangle::new(self.origin.col, self.origin.row, self.width, self.height)
    }
}
