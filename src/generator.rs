//! Tile generation: fresh rows with one guaranteed match slot, row regeneration after a
//! reset, and the reachability fix applied to the upcoming row after every hit.

use crate::board::{Board, Row};
use crate::tile::{
    Character, ColorPair, PowerUp, RowId, Shape, Tile, TileId, TileSize, random_expression,
    random_shape,
};
use log::debug;
use rand::Rng;
use rand::seq::IndexedRandom;

pub const PALETTE_SIZE: usize = 6;

/// Chance (percent) that a tile outside the match slot carries a power-up.
const POWER_UP_CHANCE_PERCENT: u32 = 25;

/// Which attribute the match slot copies from the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotMatch {
    Shape,
    Color,
}

/// How a tile is patched when the next row has nothing reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Patch {
    Shape,
    Color,
    Both,
}

#[derive(Debug, Clone)]
pub struct TileGenerator {
    palette: [ColorPair; PALETTE_SIZE],
    tiles_per_row: usize,
    tile_size: TileSize,
}

impl TileGenerator {
    pub fn new(palette: [ColorPair; PALETTE_SIZE], tiles_per_row: usize, tile_size: TileSize) -> Self {
        Self {
            palette,
            tiles_per_row: tiles_per_row.max(1),
            tile_size,
        }
    }

    pub fn palette(&self) -> &[ColorPair; PALETTE_SIZE] {
        &self.palette
    }

    /// Applies a league change.
    pub fn configure(&mut self, tiles_per_row: usize, tile_size: TileSize) {
        self.tiles_per_row = tiles_per_row.max(1);
        self.tile_size = tile_size;
    }

    /// A full row for `row_id` at the given reset generation.
    pub fn generate_row<R: Rng + ?Sized>(
        &self,
        row_id: RowId,
        home_offset: f32,
        character: &Character,
        rng: &mut R,
    ) -> Row {
        let tiles = self.generate_tiles(row_id, 0, character, rng);
        Row::new(row_id, tiles, home_offset)
    }

    /// Builds `count` rows stacked `spacing` apart above the container.
    pub fn generate_board<R: Rng + ?Sized>(
        &self,
        count: usize,
        row_height: f32,
        spacing: f32,
        character: &Character,
        rng: &mut R,
    ) -> Board {
        let rows = (0..count)
            .map(|i| {
                self.generate_row(
                    RowId(i),
                    Board::home_offset(i, row_height, spacing),
                    character,
                    rng,
                )
            })
            .collect();
        Board::new(rows, spacing)
    }

    /// Replaces the tiles of a row and bumps its generation. Unknown rows are skipped.
    pub fn regenerate_row<R: Rng + ?Sized>(
        &self,
        board: &mut Board,
        row_id: RowId,
        character: &Character,
        rng: &mut R,
    ) -> bool {
        let Some(row) = board.row_mut(row_id) else {
            debug!("regenerate skipped: {row_id} is not on the board");
            return false;
        };
        row.generation = row.generation.wrapping_add(1);
        row.tiles = self.generate_tiles(row_id, row.generation, character, rng);
        true
    }

    /// Makes sure the row after `row_id` (wrapping) has a tile matching the character.
    /// Returns the index of the patched tile, if one had to be patched.
    pub fn ensure_next_row_reachable<R: Rng + ?Sized>(
        &self,
        board: &mut Board,
        row_id: RowId,
        character: &Character,
        rng: &mut R,
    ) -> Option<usize> {
        let next_id = board.next_row_id(row_id)?;
        let next = board.row_mut(next_id)?;
        if next.tiles.is_empty() || next.tiles.iter().any(|t| t.reachable_by(character)) {
            return None;
        }
        let index = rng.random_range(0..next.tiles.len());
        let patch = [Patch::Shape, Patch::Color, Patch::Both]
            .choose(rng)
            .copied()
            .unwrap_or(Patch::Both);
        let tile = &mut next.tiles[index];
        if matches!(patch, Patch::Shape | Patch::Both) {
            tile.shape = character.shape;
        }
        if matches!(patch, Patch::Color | Patch::Both) {
            tile.colors = character.colors;
        }
        debug!("{next_id}: tile {index} patched ({patch:?}) to stay reachable");
        Some(index)
    }

    fn generate_tiles<R: Rng + ?Sized>(
        &self,
        row_id: RowId,
        generation: u32,
        character: &Character,
        rng: &mut R,
    ) -> Vec<Tile> {
        let match_slot = rng.random_range(0..self.tiles_per_row);
        (0..self.tiles_per_row)
            .map(|index| {
                let id = TileId {
                    row: row_id,
                    index,
                    generation,
                };
                if index == match_slot {
                    let axis = if rng.random_bool(0.5) {
                        SlotMatch::Shape
                    } else {
                        SlotMatch::Color
                    };
                    self.matching_tile(id, axis, character, rng)
                } else {
                    self.plain_tile(id, rng)
                }
            })
            .collect()
    }

    /// Tile matching the character on exactly one axis; never carries a power-up.
    fn matching_tile<R: Rng + ?Sized>(
        &self,
        id: TileId,
        axis: SlotMatch,
        character: &Character,
        rng: &mut R,
    ) -> Tile {
        let (shape, colors) = match axis {
            SlotMatch::Shape => {
                let others: Vec<ColorPair> = self
                    .palette
                    .iter()
                    .copied()
                    .filter(|p| p.shape != character.colors.shape)
                    .collect();
                let colors = others.choose(rng).copied().unwrap_or_else(|| self.random_colors(rng));
                (character.shape, colors)
            }
            SlotMatch::Color => {
                let others: Vec<Shape> = Shape::ALL
                    .into_iter()
                    .filter(|s| *s != character.shape)
                    .collect();
                let shape = others.choose(rng).copied().unwrap_or_else(|| random_shape(rng));
                (shape, character.colors)
            }
        };
        Tile {
            id,
            shape,
            size: self.tile_size,
            expression: random_expression(rng),
            colors,
            power_up: PowerUp::None,
        }
    }

    fn plain_tile<R: Rng + ?Sized>(&self, id: TileId, rng: &mut R) -> Tile {
        let power_up = if rng.random_range(0..100) < POWER_UP_CHANCE_PERCENT {
            PowerUp::ACTIVE
                .choose(rng)
                .copied()
                .unwrap_or(PowerUp::None)
        } else {
            PowerUp::None
        };
        Tile {
            id,
            shape: random_shape(rng),
            size: self.tile_size,
            expression: random_expression(rng),
            colors: self.random_colors(rng),
            power_up,
        }
    }

    fn random_colors<R: Rng + ?Sized>(&self, rng: &mut R) -> ColorPair {
        self.palette[rng.random_range(0..PALETTE_SIZE)]
    }
}
