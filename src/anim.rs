//! Visual tile positions, eased toward the slots the board puts them in.
//! Keyed by tile identity; the board itself knows nothing about animation.

use crate::board::{Board, TileId};
use crate::geometry::Layout;
use std::collections::HashMap;

/// Time constant of the exponential ease, in ms.
const EASE_MS: f32 = 45.0;
/// Closer than this (in cells) snaps to the target.
const SNAP_DIST: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Visual {
    x: f32,
    y: f32,
}

#[derive(Debug, Default)]
pub struct Anim {
    tiles: HashMap<TileId, Visual>,
    enabled: bool,
}

impl Anim {
    pub fn new(enabled: bool) -> Self {
        Self { tiles: HashMap::new(), enabled }
    }

    /// Start the tile's visual at `(x, y)`, e.g. where a drag was released.
    pub fn warp(&mut self, id: TileId, (x, y): (u16, u16)) {
        self.tiles.insert(id, Visual { x: f32::from(x), y: f32::from(y) });
    }

    /// Move every visual toward its tile's slot. New tiles appear in place;
    /// tiles gone from the board are forgotten.
    pub fn update(&mut self, board: &Board, layout: &Layout, dt_ms: u64) {
        let k = if self.enabled { 1.0 - (-(dt_ms as f32) / EASE_MS).exp() } else { 1.0 };
        let mut live = HashMap::with_capacity(self.tiles.len());
        for (pos, tile) in board.tiles() {
            let (tx, ty) = layout.to_pixel(pos);
            let (tx, ty) = (f32::from(tx), f32::from(ty));
            let mut v = self.tiles.get(&tile.id).copied().unwrap_or(Visual { x: tx, y: ty });
            v.x += (tx - v.x) * k;
            v.y += (ty - v.y) * k;
            if (tx - v.x).abs() < SNAP_DIST && (ty - v.y).abs() < SNAP_DIST {
                v = Visual { x: tx, y: ty };
            }
            live.insert(tile.id, v);
        }
        self.tiles = live;
    }

    /// Where to draw the tile, in terminal cells.
    pub fn position(&self, id: TileId) -> Option<(u16, u16)> {
        self.tiles.get(&id).map(|v| (v.x.round().max(0.0) as u16, v.y.round().max(0.0) as u16))
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}
