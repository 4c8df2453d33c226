//! League levels: the immutable per-level configuration table and speed milestones.

use crate::tile::TileSize;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Elapsed-second thresholds; crossing each one raises the speed once.
pub const SPEED_MILESTONES: [u32; 8] = [15, 30, 60, 180, 360, 720, 1440, 2880];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum League {
    #[default]
    Easy,
    Medium,
    Hard,
    Legend,
}

/// Read-only settings of one league.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeagueConfig {
    /// Tiles (lanes) per row.
    pub tiles_per_row: usize,
    /// Vertical distance between consecutive rows, in px.
    pub initial_row_spacing: f32,
    /// Row advance per animation frame at game start, in px.
    pub initial_speed: f32,
    /// Added to the speed at each milestone.
    pub speed_increment: f32,
    /// Score needed to be promoted; `None` for the top league.
    pub next_level_points: Option<u32>,
    pub points_per_match: u32,
    /// Score at which the celebration effect fires.
    pub show_confetti_score: u32,
    pub tile_size: TileSize,
}

const EASY: LeagueConfig = LeagueConfig {
    tiles_per_row: 3,
    initial_row_spacing: 400.0,
    initial_speed: 2.5,
    speed_increment: 0.2,
    next_level_points: Some(100),
    points_per_match: 1,
    show_confetti_score: 50,
    tile_size: TileSize::Xl,
};

const MEDIUM: LeagueConfig = LeagueConfig {
    tiles_per_row: 4,
    initial_row_spacing: 360.0,
    initial_speed: 3.0,
    speed_increment: 0.3,
    next_level_points: Some(250),
    points_per_match: 2,
    show_confetti_score: 120,
    tile_size: TileSize::Lg,
};

const HARD: LeagueConfig = LeagueConfig {
    tiles_per_row: 5,
    initial_row_spacing: 320.0,
    initial_speed: 3.5,
    speed_increment: 0.4,
    next_level_points: Some(500),
    points_per_match: 3,
    show_confetti_score: 240,
    tile_size: TileSize::Md,
};

const LEGEND: LeagueConfig = LeagueConfig {
    tiles_per_row: 6,
    initial_row_spacing: 280.0,
    initial_speed: 4.0,
    speed_increment: 0.5,
    next_level_points: None,
    points_per_match: 5,
    show_confetti_score: 500,
    tile_size: TileSize::Sm,
};

impl League {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Legend];

    pub fn config(self) -> &'static LeagueConfig {
        match self {
            Self::Easy => &EASY,
            Self::Medium => &MEDIUM,
            Self::Hard => &HARD,
            Self::Legend => &LEGEND,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Legend => "legend",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Easy => Some(Self::Medium),
            Self::Medium => Some(Self::Hard),
            Self::Hard => Some(Self::Legend),
            Self::Legend => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            Self::Easy => None,
            Self::Medium => Some(Self::Easy),
            Self::Hard => Some(Self::Medium),
            Self::Legend => Some(Self::Hard),
        }
    }

    /// League the player is promoted to after finishing a game with `final_score`.
    pub fn promotion_for(self, final_score: u32) -> Option<Self> {
        let threshold = self.config().next_level_points?;
        if final_score >= threshold {
            self.next()
        } else {
            None
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown league level: {0}")]
pub struct ParseLeagueError(String);

impl FromStr for League {
    type Err = ParseLeagueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLeagueError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easy_league_matches_reference_values() {
        let cfg = League::Easy.config();
        assert_eq!(cfg.tiles_per_row, 3);
        assert_eq!(cfg.points_per_match, 1);
    }

    #[test]
    fn parse_league_names() {
        assert_eq!("legend".parse::<League>(), Ok(League::Legend));
        assert_eq!(" Hard ".parse::<League>(), Ok(League::Hard));
        assert!("grandmaster".parse::<League>().is_err());
    }

    #[test]
    fn promotion_requires_threshold_and_a_next_league() {
        assert_eq!(League::Easy.promotion_for(99), None);
        assert_eq!(League::Easy.promotion_for(100), Some(League::Medium));
        assert_eq!(League::Legend.promotion_for(u32::MAX), None);
    }

    #[test]
    fn milestones_are_ascending() {
        assert!(SPEED_MILESTONES.windows(2).all(|w| w[0] < w[1]));
    }
}
