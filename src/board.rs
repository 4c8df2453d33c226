//! Board: the rows of tiles and the virtual-pixel geometry used to lay them out.

use crate::collision::HitBox;
use crate::tile::{RowId, Tile, TileSize};

/// Vertical gap between a tile and the edges of its row, in px.
const ROW_PADDING: f32 = 8.0;
/// Gap between the character and the bottom of the container, in px.
const CHARACTER_BOTTOM_MARGIN: f32 = 12.0;
/// Share of the character box trimmed off each side to form its hit area.
const HIT_AREA_INSET: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    /// Parked at its home offset, waiting for the animation to start.
    Positioned,
    Scrolling,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub id: RowId,
    pub tiles: Vec<Tile>,
    /// Top edge in px; negative while above the container.
    pub offset: f32,
    /// Offset the row starts from, and falls back to when it scrolls alone.
    pub home_offset: f32,
    /// Bumped every time the row cycles back to the top.
    pub generation: u32,
    pub phase: RowPhase,
}

impl Row {
    pub fn new(id: RowId, tiles: Vec<Tile>, home_offset: f32) -> Self {
        Self {
            id,
            tiles,
            offset: home_offset,
            home_offset,
            generation: 0,
            phase: RowPhase::Positioned,
        }
    }

    pub fn is_scrolling(&self) -> bool {
        self.phase == RowPhase::Scrolling
    }
}

/// Sizes of the board in virtual px, as measured by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub lanes: usize,
    pub lane_width: f32,
    pub container_height: f32,
    pub tile_size: TileSize,
}

impl BoardGeometry {
    pub fn new(lanes: usize, lane_width: f32, container_height: f32, tile_size: TileSize) -> Self {
        Self {
            lanes: lanes.max(1),
            lane_width: lane_width.max(1.0),
            container_height: container_height.max(1.0),
            tile_size,
        }
    }

    pub fn board_width(&self) -> f32 {
        self.lanes as f32 * self.lane_width
    }

    /// Edge length of a tile (and of the character).
    pub fn tile_px(&self) -> f32 {
        self.lane_width * self.tile_size.lane_fraction()
    }

    pub fn row_height(&self) -> f32 {
        self.tile_px() + 2.0 * ROW_PADDING
    }

    pub fn character_width(&self) -> f32 {
        self.tile_px()
    }

    /// Left edge of an item of `width` centred in `lane`.
    pub fn lane_left(&self, lane: usize, width: f32) -> f32 {
        lane as f32 * self.lane_width + (self.lane_width - width) / 2.0
    }

    pub fn tile_hit_box(&self, row_offset: f32, index: usize) -> HitBox {
        let size = self.tile_px();
        HitBox {
            left: self.lane_left(index, size),
            top: row_offset + ROW_PADDING,
            width: size,
            height: size,
        }
    }

    pub fn character_top(&self) -> f32 {
        self.container_height - self.tile_px() - CHARACTER_BOTTOM_MARGIN
    }

    /// Character box at horizontal position `x`, trimmed to its hit area.
    pub fn character_hit_box(&self, x: f32) -> HitBox {
        let size = self.tile_px();
        let inset = size * HIT_AREA_INSET;
        HitBox {
            left: x + inset,
            top: self.character_top() + inset,
            width: size - 2.0 * inset,
            height: size - 2.0 * inset,
        }
    }
}

/// Owns the rows in order; `row{n}` lives at index `n`.
#[derive(Debug, Clone, Default)]
pub struct Board {
    rows: Vec<Row>,
    spacing: f32,
}

impl Board {
    pub fn new(rows: Vec<Row>, spacing: f32) -> Self {
        Self { rows, spacing }
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id.index())
    }

    pub fn row_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.get_mut(id.index())
    }

    pub fn tile(&self, id: RowId, index: usize) -> Option<&Tile> {
        self.row(id).and_then(|r| r.tiles.get(index))
    }

    /// Row after `id`, wrapping to `row0` after the last one.
    pub fn next_row_id(&self, id: RowId) -> Option<RowId> {
        if self.rows.is_empty() || id.index() >= self.rows.len() {
            return None;
        }
        Some(RowId((id.index() + 1) % self.rows.len()))
    }

    /// Home offset of row `index`: stacked above the container, `spacing` apart.
    pub fn home_offset(index: usize, row_height: f32, spacing: f32) -> f32 {
        -row_height - index as f32 * spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> BoardGeometry {
        BoardGeometry::new(3, 100.0, 600.0, TileSize::Xl)
    }

    #[test]
    fn tiles_are_centred_in_their_lane() {
        let g = geometry();
        let hb = g.tile_hit_box(0.0, 1);
        assert!((hb.left - 105.0).abs() < 1e-4);
        assert!((hb.width - 90.0).abs() < 1e-4);
    }

    #[test]
    fn character_hit_area_is_inside_the_container() {
        let g = geometry();
        let hb = g.character_hit_box(g.lane_left(0, g.character_width()));
        assert!(hb.left >= 0.0);
        assert!(hb.top + hb.height <= g.container_height);
    }

    #[test]
    fn next_row_wraps_around() {
        let board = Board::new(
            (0..3)
                .map(|i| Row::new(RowId(i), Vec::new(), 0.0))
                .collect(),
            400.0,
        );
        assert_eq!(board.next_row_id(RowId(0)), Some(RowId(1)));
        assert_eq!(board.next_row_id(RowId(2)), Some(RowId(0)));
        assert_eq!(board.next_row_id(RowId(3)), None);
    }
}
