//! Tile model: shapes, colours, expressions, power-ups, tile/row identity and the character.

use rand::Rng;
use rand::seq::IndexedRandom;
use ratatui::style::Color;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tile and character shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Rhomb,
    Star,
}

impl Shape {
    pub const ALL: [Self; 5] = [
        Self::Circle,
        Self::Square,
        Self::Triangle,
        Self::Rhomb,
        Self::Star,
    ];

    /// Terminal glyph for the shape.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Circle => "●",
            Self::Square => "■",
            Self::Triangle => "▲",
            Self::Rhomb => "◆",
            Self::Star => "★",
        }
    }
}

/// Face drawn on tiles and on the character; purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    Smile,
    Grin,
    Wink,
    Surprised,
}

impl Expression {
    pub const ALL: [Self; 4] = [Self::Smile, Self::Grin, Self::Wink, Self::Surprised];

    pub fn face(self) -> &'static str {
        match self {
            Self::Smile => "^‿^",
            Self::Grin => "^▽^",
            Self::Wink => "^‿~",
            Self::Surprised => "°o°",
        }
    }
}

/// Tile size class; smaller leagues use bigger tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSize {
    Sm,
    Md,
    Lg,
    Xl,
}

impl TileSize {
    /// Share of the lane width a tile of this size occupies.
    pub fn lane_fraction(self) -> f32 {
        match self {
            Self::Sm => 0.6,
            Self::Md => 0.7,
            Self::Lg => 0.8,
            Self::Xl => 0.9,
        }
    }
}

/// Power-up carried by a tile. `None` is the plain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerUp {
    #[default]
    None,
    DoublePoints,
    AnyShape,
    AnyColor,
    Indestructible,
}

impl PowerUp {
    /// Every power-up a tile can roll (excludes `None`).
    pub const ACTIVE: [Self; 4] = [
        Self::DoublePoints,
        Self::AnyShape,
        Self::AnyColor,
        Self::Indestructible,
    ];

    /// Short badge drawn on the tile.
    pub fn badge(self) -> &'static str {
        match self {
            Self::None => "",
            Self::DoublePoints => "x2",
            Self::AnyShape => "?S",
            Self::AnyColor => "?C",
            Self::Indestructible => "!!",
        }
    }
}

/// Shape colour plus background colour; compared verbatim for colour matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub shape: Color,
    pub background: Color,
}

/// Row identity, displayed as `row{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl RowId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row{}", self.0)
    }
}

/// Tile identity `row{r}-tile{i}-{generation}`; the generation distinguishes
/// tiles rendered after a row reset from the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub row: RowId,
    pub index: usize,
    pub generation: u32,
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-tile{}-{}", self.row, self.index, self.generation)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed tile id: {0}")]
pub struct ParseTileIdError(String);

impl FromStr for TileId {
    type Err = ParseTileIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTileIdError(s.to_string());
        let mut parts = s.split('-');
        let row = parts
            .next()
            .and_then(|p| p.strip_prefix("row"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(err)?;
        let index = parts
            .next()
            .and_then(|p| p.strip_prefix("tile"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(err)?;
        let generation = parts.next().and_then(|n| n.parse().ok()).ok_or_else(err)?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self {
            row: RowId(row),
            index,
            generation,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub shape: Shape,
    pub size: TileSize,
    pub expression: Expression,
    pub colors: ColorPair,
    pub power_up: PowerUp,
}

impl Tile {
    /// True if the tile shares the character's shape or shape colour.
    pub fn reachable_by(&self, character: &Character) -> bool {
        self.shape == character.shape || self.colors.shape == character.colors.shape
    }
}

/// The player's avatar. Mutated in place on every successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub shape: Shape,
    pub colors: ColorPair,
    pub expression: Expression,
    pub size: TileSize,
}

impl Character {
    /// Random shape, shape colour, background colour and expression.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, palette: &[ColorPair], size: TileSize) -> Self {
        let shape = random_shape(rng);
        let shape_color = palette.choose(rng).map(|p| p.shape).unwrap_or(Color::White);
        let background = palette
            .choose(rng)
            .map(|p| p.background)
            .unwrap_or(Color::Black);
        Self {
            shape,
            colors: ColorPair {
                shape: shape_color,
                background,
            },
            expression: random_expression(rng),
            size,
        }
    }
}

pub fn random_shape<R: Rng + ?Sized>(rng: &mut R) -> Shape {
    Shape::ALL[rng.random_range(0..Shape::ALL.len())]
}

pub fn random_expression<R: Rng + ?Sized>(rng: &mut R) -> Expression {
    Expression::ALL[rng.random_range(0..Expression::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_id_round_trips_through_display() {
        let id = TileId {
            row: RowId(2),
            index: 1,
            generation: 7,
        };
        assert_eq!(id.to_string(), "row2-tile1-7");
        assert_eq!("row2-tile1-7".parse::<TileId>(), Ok(id));
    }

    #[test]
    fn malformed_tile_ids_are_rejected() {
        assert!("row2-tile1".parse::<TileId>().is_err());
        assert!("rowX-tile1-0".parse::<TileId>().is_err());
        assert!("row1-tile1-0-9".parse::<TileId>().is_err());
        assert!("".parse::<TileId>().is_err());
    }

    #[test]
    fn power_up_active_excludes_none() {
        assert!(!PowerUp::ACTIVE.contains(&PowerUp::None));
        assert_eq!(PowerUp::default(), PowerUp::None);
    }
}
