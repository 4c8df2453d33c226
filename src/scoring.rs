//! Match evaluation and scoring: power-up resolution, shape/colour match, point award and
//! the character update that follows a match.

use crate::tile::{Character, PowerUp, Tile, random_expression};
use rand::Rng;

/// One-shot effects a tile's power-up grants on collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerUpEffects {
    pub double_points: bool,
    pub accept_any_shape: bool,
    pub accept_any_color: bool,
    pub indestructible: bool,
}

impl PowerUpEffects {
    pub fn resolve(power_up: PowerUp) -> Self {
        let mut fx = Self::default();
        match power_up {
            PowerUp::None => {}
            PowerUp::DoublePoints => fx.double_points = true,
            PowerUp::AnyShape => fx.accept_any_shape = true,
            PowerUp::AnyColor => fx.accept_any_color = true,
            PowerUp::Indestructible => fx.indestructible = true,
        }
        fx
    }

    pub fn any(&self) -> bool {
        self.double_points || self.accept_any_shape || self.accept_any_color || self.indestructible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub shape_match: bool,
    pub color_match: bool,
    pub effects: PowerUpEffects,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        self.shape_match || self.color_match
    }
}

/// Decides whether `tile` matches `character`.
///
/// While indestructible mode is active everything matches. Otherwise `AnyShape` accepts the
/// tile on both axes and `AnyColor` on the colour axis only. The returned effects are the
/// tile's full power-up set; callers apply them only when the outcome is a match.
pub fn evaluate(tile: &Tile, character: &Character, indestructible_active: bool) -> MatchOutcome {
    let effects = PowerUpEffects::resolve(tile.power_up);
    if indestructible_active {
        return MatchOutcome {
            shape_match: true,
            color_match: true,
            effects,
        };
    }
    let mut shape_match = tile.shape == character.shape;
    let mut color_match = tile.colors.shape == character.colors.shape;
    if effects.accept_any_shape {
        shape_match = true;
        color_match = true;
    }
    if effects.accept_any_color {
        color_match = true;
    }
    MatchOutcome {
        shape_match,
        color_match,
        effects,
    }
}

/// `ppm` for a single-axis match, `2 × ppm` for a double match or double points (they do
/// not stack), nothing without a match.
pub fn award_points(points_per_match: u32, shape_match: bool, color_match: bool, double_points: bool) -> u32 {
    if !(shape_match || color_match) {
        return 0;
    }
    if double_points || (shape_match && color_match) {
        points_per_match.saturating_mul(2)
    } else {
        points_per_match
    }
}

impl Character {
    /// Takes on the tile's attributes after a match: the shape follows a colour match, the
    /// colours follow a shape match. The expression is always re-rolled.
    pub fn absorb<R: Rng + ?Sized>(&mut self, tile: &Tile, outcome: &MatchOutcome, rng: &mut R) {
        if outcome.color_match {
            self.shape = tile.shape;
        }
        if outcome.shape_match {
            self.colors = tile.colors;
        }
        self.expression = random_expression(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{test_character, test_palette};
    use crate::tile::{RowId, Shape, TileId, TileSize};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tile(shape: Shape, palette_index: usize, power_up: PowerUp) -> Tile {
        Tile {
            id: TileId {
                row: RowId(0),
                index: 0,
                generation: 0,
            },
            shape,
            size: TileSize::Xl,
            expression: crate::tile::Expression::Grin,
            colors: test_palette()[palette_index],
            power_up,
        }
    }

    fn points(o: &MatchOutcome, ppm: u32) -> u32 {
        award_points(ppm, o.shape_match, o.color_match, o.effects.double_points)
    }

    #[test]
    fn point_tiers() {
        assert_eq!(award_points(3, true, false, false), 3);
        assert_eq!(award_points(3, false, true, false), 3);
        assert_eq!(award_points(3, true, true, false), 6);
        assert_eq!(award_points(3, true, false, true), 6);
        assert_eq!(award_points(3, true, true, true), 6);
        assert_eq!(award_points(3, false, false, true), 0);
    }

    #[test]
    fn plain_comparison() {
        let c = test_character();
        let o = evaluate(&tile(Shape::Circle, 2, PowerUp::None), &c, false);
        assert!(o.shape_match && !o.color_match);
        let o = evaluate(&tile(Shape::Star, 0, PowerUp::None), &c, false);
        assert!(!o.shape_match && o.color_match);
        let o = evaluate(&tile(Shape::Star, 2, PowerUp::None), &c, false);
        assert!(!o.is_match());
    }

    #[test]
    fn any_shape_forces_both_axes() {
        let c = test_character();
        let o = evaluate(&tile(Shape::Star, 2, PowerUp::AnyShape), &c, false);
        assert!(o.shape_match && o.color_match);
        assert_eq!(points(&o, 1), 2);
    }

    #[test]
    fn any_color_forces_colour_only() {
        let c = test_character();
        let o = evaluate(&tile(Shape::Star, 2, PowerUp::AnyColor), &c, false);
        assert!(!o.shape_match && o.color_match);
        assert_eq!(points(&o, 1), 1);
    }

    #[test]
    fn indestructible_mode_matches_everything() {
        let c = test_character();
        let o = evaluate(&tile(Shape::Star, 2, PowerUp::None), &c, true);
        assert!(o.shape_match && o.color_match);
    }

    #[test]
    fn double_points_does_not_make_a_match() {
        let c = test_character();
        let o = evaluate(&tile(Shape::Star, 2, PowerUp::DoublePoints), &c, false);
        assert!(!o.is_match());
        assert_eq!(points(&o, 4), 0);
    }

    #[test]
    fn shape_only_match_keeps_shape_and_takes_tile_colours() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = test_character();
        let t = tile(Shape::Circle, 4, PowerUp::None);
        let o = evaluate(&t, &c, false);
        c.absorb(&t, &o, &mut rng);
        assert_eq!(c.shape, Shape::Circle);
        assert_eq!(c.colors, test_palette()[4]);
    }

    #[test]
    fn colour_only_match_takes_tile_shape_and_keeps_colours() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = test_character();
        let t = tile(Shape::Triangle, 0, PowerUp::None);
        let o = evaluate(&t, &c, false);
        c.absorb(&t, &o, &mut rng);
        assert_eq!(c.shape, Shape::Triangle);
        assert_eq!(c.colors, test_palette()[0]);
    }
}
