//! Triangular grid geometry: row widths, fall targets, and the mapping between
//! grid positions and terminal cells.
//!
//! Row 0 is the hand. Every row below is one tile narrower than the row above
//! and is centered under it, so a tile at `(r, c)` sits between the two tiles
//! `(r-1, c)` and `(r-1, c+1)` of the row above.

/// Width of the hand row (row 0).
pub const HAND_WIDTH: usize = 7;

/// Number of rows including the hand: widths 7, 6, 5, 4, 3, 2.
pub const ROW_COUNT: usize = 6;

/// Row index of the hand.
pub const HAND_ROW: usize = 0;

/// Row index of the bottom row.
pub const BOTTOM_ROW: usize = ROW_COUNT - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

impl GridPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn is_valid(self) -> bool {
        self.row < ROW_COUNT && self.col < row_width(self.row)
    }

    pub fn is_hand(self) -> bool {
        self.row == HAND_ROW
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Number of slots in `row`; 0 for rows past the bottom.
#[inline]
pub const fn row_width(row: usize) -> usize {
    if row < ROW_COUNT { HAND_WIDTH - row } else { 0 }
}

/// Total number of slots on the board, hand included.
pub const fn capacity() -> usize {
    let mut total = 0;
    let mut row = 0;
    while row < ROW_COUNT {
        total += row_width(row);
        row += 1;
    }
    total
}

/// All valid positions, row-major, top to bottom.
pub fn positions() -> impl Iterator<Item = GridPos> {
    (0..ROW_COUNT).flat_map(|row| (0..row_width(row)).map(move |col| GridPos::new(row, col)))
}

/// Positions in row `r+1` a tile at `pos` may fall into, left candidate first.
///
/// The left-before-right order decides which way tiles drift when both
/// candidates are free.
pub fn fall_targets(pos: GridPos) -> impl Iterator<Item = GridPos> {
    let below = pos.row + 1;
    let left = (below < ROW_COUNT && pos.col >= 1).then(|| GridPos::new(below, pos.col - 1));
    let right = (below < ROW_COUNT && pos.col < row_width(below)).then(|| GridPos::new(below, pos.col));
    [left, right].into_iter().flatten()
}

/// The two positions in the wider row above `pos` that can fall into it.
/// Empty for the hand row.
pub fn parents(pos: GridPos) -> impl Iterator<Item = GridPos> {
    let above = (pos.row > HAND_ROW && pos.is_valid()).then(|| pos.row - 1);
    above
        .into_iter()
        .flat_map(move |r| [GridPos::new(r, pos.col), GridPos::new(r, pos.col + 1)])
}

/// Tile center in grid units (one tile = 1.0 wide, one row = 1.0 tall).
/// Used for nearest-slot searches, independent of any viewport.
pub fn unit_center(pos: GridPos) -> (f32, f32) {
    (pos.col as f32 + pos.row as f32 * 0.5, pos.row as f32)
}

/// Squared distance between two slots in grid units.
pub fn unit_distance_sq(a: GridPos, b: GridPos) -> f32 {
    let (ax, ay) = unit_center(a);
    let (bx, by) = unit_center(b);
    (ax - bx).powi(2) + (ay - by).powi(2)
}

/// Tile sizes tried by [`Layout::new`], largest first: (width, height, column gap, row gap).
/// The horizontal stride (width + gap) is kept even so rows can be offset by half a stride.
const TILE_PRESETS: [(u16, u16, u16, u16); 3] = [(7, 3, 1, 1), (5, 3, 1, 0), (3, 1, 1, 0)];

/// Extra blank rows between the hand and row 1.
const HAND_SEPARATION: u16 = 1;

/// Board placement in terminal cells, derived from the viewport size only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub tile_w: u16,
    pub tile_h: u16,
    pub gap_x: u16,
    pub gap_y: u16,
    pub origin_x: u16,
    pub origin_y: u16,
}

impl Layout {
    /// Largest preset that fits `width` x `height`, centered. Falls back to the
    /// smallest preset anchored at the top-left when nothing fits.
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        let mut chosen = None;
        for &(tile_w, tile_h, gap_x, gap_y) in &TILE_PRESETS {
            let candidate = Self { tile_w, tile_h, gap_x, gap_y, origin_x: 0, origin_y: 0 };
            let (bw, bh) = candidate.board_size();
            if bw <= width && bh <= height {
                chosen = Some(Self {
                    origin_x: x + (width - bw) / 2,
                    origin_y: y + (height - bh) / 2,
                    ..candidate
                });
                break;
            }
        }
        chosen.unwrap_or_else(|| {
            let (tile_w, tile_h, gap_x, gap_y) = TILE_PRESETS[TILE_PRESETS.len() - 1];
            Self { tile_w, tile_h, gap_x, gap_y, origin_x: x, origin_y: y }
        })
    }

    fn stride_x(&self) -> u16 {
        self.tile_w + self.gap_x
    }

    fn stride_y(&self) -> u16 {
        self.tile_h + self.gap_y
    }

    fn row_pixel_width(&self, row: usize) -> u16 {
        let w = row_width(row) as u16;
        if w == 0 { 0 } else { w * self.tile_w + (w - 1) * self.gap_x }
    }

    /// Board size in terminal cells (widest row x all rows).
    pub fn board_size(&self) -> (u16, u16) {
        let rows = ROW_COUNT as u16;
        let height = rows * self.tile_h + (rows - 1) * self.gap_y + HAND_SEPARATION;
        (self.row_pixel_width(HAND_ROW), height)
    }

    fn row_y(&self, row: usize) -> u16 {
        let sep = if row > HAND_ROW { HAND_SEPARATION } else { 0 };
        self.origin_y + row as u16 * self.stride_y() + sep
    }

    fn row_x(&self, row: usize) -> u16 {
        let indent = (self.row_pixel_width(HAND_ROW) - self.row_pixel_width(row)) / 2;
        self.origin_x + indent
    }

    /// Top-left terminal cell of the tile at `pos`.
    pub fn to_pixel(&self, pos: GridPos) -> (u16, u16) {
        (self.row_x(pos.row) + pos.col as u16 * self.stride_x(), self.row_y(pos.row))
    }

    /// Slot covering terminal cell `(x, y)`. `None` inside gaps or outside the board.
    pub fn to_grid(&self, x: u16, y: u16) -> Option<GridPos> {
        (0..ROW_COUNT).find_map(|row| {
            let top = self.row_y(row);
            if y < top || y >= top + self.tile_h {
                return None;
            }
            let left = self.row_x(row);
            if x < left {
                return None;
            }
            let dx = x - left;
            let col = (dx / self.stride_x()) as usize;
            let inside_tile = dx % self.stride_x() < self.tile_w;
            (inside_tile && col < row_width(row)).then_some(GridPos::new(row, col))
        })
    }
}
