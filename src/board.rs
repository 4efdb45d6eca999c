//! Board: the triangular grid of tile slots. Pure data, no timers.

use crate::dictionary::Dictionary;
use crate::geometry::{self, BOTTOM_ROW, GridPos, ROW_COUNT, row_width};
use crate::letters::Letter;
use crate::scoring;

/// Identity of a tile, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u64);

/// Logical tile. Position is the slot that holds it; timing and animation
/// state live elsewhere, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub letter: Letter,
    /// True iff the tile has no legal downward move.
    pub settled: bool,
}

impl Tile {
    pub fn new(id: TileId, letter: Letter) -> Self {
        Self { id, letter, settled: false }
    }
}

/// Outcome of reading one full row at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub row: usize,
    pub word: String,
    pub valid: bool,
    pub points: u32,
}

/// Grid of slots. `rows[r][c]` is the slot at `(r, c)`; row 0 is the hand.
#[derive(Debug, Clone)]
pub struct Board {
    rows: Vec<Vec<Option<Tile>>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let rows = (0..ROW_COUNT).map(|r| vec![None; row_width(r)]).collect();
        Self { rows }
    }

    #[inline]
    pub fn get(&self, pos: GridPos) -> Option<&Tile> {
        self.rows.get(pos.row)?.get(pos.col)?.as_ref()
    }

    #[inline]
    fn slot_mut(&mut self, pos: GridPos) -> Option<&mut Option<Tile>> {
        self.rows.get_mut(pos.row)?.get_mut(pos.col)
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.get(pos).is_some()
    }

    /// True for valid, unoccupied slots.
    pub fn is_empty(&self, pos: GridPos) -> bool {
        pos.is_valid() && self.get(pos).is_none()
    }

    /// Put `tile` into an empty valid slot. Hands the tile back otherwise.
    pub fn place(&mut self, pos: GridPos, tile: Tile) -> Result<(), Tile> {
        match self.slot_mut(pos) {
            Some(slot) if slot.is_none() => {
                *slot = Some(tile);
                Ok(())
            }
            _ => Err(tile),
        }
    }

    /// Put `tile` into `pos` regardless of occupancy, returning any tile it displaced.
    /// Invalid positions hand the tile back.
    pub fn force_place(&mut self, pos: GridPos, tile: Tile) -> Option<Tile> {
        match self.slot_mut(pos) {
            Some(slot) => slot.replace(tile),
            None => Some(tile),
        }
    }

    pub fn remove(&mut self, pos: GridPos) -> Option<Tile> {
        self.slot_mut(pos)?.take()
    }

    /// Move the tile at `from` into the empty slot `to`. No-op unless both hold.
    pub fn move_tile(&mut self, from: GridPos, to: GridPos) -> bool {
        if !self.is_empty(to) {
            return false;
        }
        match self.remove(from) {
            Some(tile) => self.place(to, tile).is_ok(),
            None => false,
        }
    }

    pub fn set_settled(&mut self, pos: GridPos, settled: bool) {
        if let Some(Some(tile)) = self.slot_mut(pos) {
            tile.settled = settled;
        }
    }

    /// Empty every slot. Returns the number of tiles removed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        for slot in self.rows.iter_mut().flatten() {
            if slot.take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Occupied slots, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = (GridPos, &Tile)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, slot)| slot.as_ref().map(|t| (GridPos::new(r, c), t)))
        })
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn find(&self, id: TileId) -> Option<GridPos> {
        self.tiles().find(|(_, t)| t.id == id).map(|(pos, _)| pos)
    }

    /// Every slot, hand included, holds a tile.
    pub fn is_full(&self) -> bool {
        self.tile_count() == geometry::capacity()
    }

    pub fn empty_positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        geometry::positions().filter(|&p| self.get(p).is_none())
    }

    /// First empty slot below the hand, scanning top-to-bottom, left-to-right.
    pub fn first_empty_below_hand(&self) -> Option<GridPos> {
        self.empty_positions().find(|p| !p.is_hand())
    }

    /// Empty slot closest to `pos` in grid units; ties go to the earlier slot in row-major order.
    pub fn nearest_empty(&self, pos: GridPos) -> Option<GridPos> {
        self.empty_positions().min_by(|&a, &b| {
            geometry::unit_distance_sq(pos, a).total_cmp(&geometry::unit_distance_sq(pos, b))
        })
    }

    /// A non-hand tile with an occupied parent slot. Hand tiles are never covered.
    pub fn is_covered(&self, pos: GridPos) -> bool {
        !pos.is_hand() && geometry::parents(pos).any(|p| self.is_occupied(p))
    }

    /// First free fall target for the tile at `pos`, left candidate first.
    pub fn free_fall_target(&self, pos: GridPos) -> Option<GridPos> {
        if pos.is_hand() {
            return None;
        }
        geometry::fall_targets(pos).find(|&t| self.is_empty(t))
    }

    /// Whether the tile at `pos` can never move without outside disturbance:
    /// bottom row, or every fall target holds a settled tile.
    pub fn rests_on_settled(&self, pos: GridPos) -> bool {
        if pos.row == BOTTOM_ROW {
            return true;
        }
        geometry::fall_targets(pos).all(|t| self.get(t).is_some_and(|tile| tile.settled))
    }

    /// Letters of a complete row, left to right.
    pub fn row_letters(&self, row: usize) -> Option<Vec<Letter>> {
        self.rows.get(row)?.iter().map(|slot| slot.as_ref().map(|t| t.letter)).collect()
    }

    /// Lower-cased word spelled by a complete row.
    pub fn read_row(&self, row: usize) -> Option<String> {
        let letters = self.row_letters(row)?;
        let mut word = String::with_capacity(letters.len() + 1);
        for letter in letters {
            letter.push_lower(&mut word);
        }
        Some(word)
    }

    /// Read and score a complete row. Invalid words score zero.
    pub fn score_row(&self, row: usize, dictionary: &Dictionary) -> Option<RowResult> {
        let letters = self.row_letters(row)?;
        let word = self.read_row(row)?;
        let valid = dictionary.contains(&word);
        let points = if valid { scoring::word_score(&letters) } else { 0 };
        Some(RowResult { row, word, valid, points })
    }
}
