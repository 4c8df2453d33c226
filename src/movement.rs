//! Character movement: lane steps mapped to a clamped horizontal position.

use crate::board::BoardGeometry;
use crate::session::GameSession;

#[derive(Debug, Clone, Default)]
pub struct MovementController {
    x: f32,
    lane: usize,
    lanes: usize,
    lane_width: f32,
    board_width: f32,
    character_width: f32,
}

impl MovementController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Position as a percentage of the board width.
    pub fn percent(&self) -> f32 {
        if self.board_width <= 0.0 {
            0.0
        } else {
            self.x / self.board_width * 100.0
        }
    }

    /// Re-syncs to new board/character sizes, keeping the current lane.
    pub fn resize(&mut self, geometry: &BoardGeometry) {
        self.lanes = geometry.lanes;
        self.lane_width = geometry.lane_width;
        self.board_width = geometry.board_width();
        self.character_width = geometry.character_width();
        self.lane = self.lane.min(self.lanes.saturating_sub(1));
        self.snap();
    }

    /// Places the character in the middle lane.
    pub fn center(&mut self) {
        self.lane = self.lanes.saturating_sub(1) / 2;
        self.snap();
    }

    pub fn move_left(&mut self, session: &GameSession) -> bool {
        if !accepts_input(session) || self.lane == 0 {
            return false;
        }
        self.lane -= 1;
        self.snap();
        true
    }

    pub fn move_right(&mut self, session: &GameSession) -> bool {
        if !accepts_input(session) || self.lane + 1 >= self.lanes {
            return false;
        }
        self.lane += 1;
        self.snap();
        true
    }

    /// Jumps straight to `lane`; out-of-range lanes are clamped to the last one.
    pub fn move_to_lane(&mut self, lane: usize, session: &GameSession) -> bool {
        if !accepts_input(session) || self.lanes == 0 {
            return false;
        }
        let lane = lane.min(self.lanes - 1);
        if lane == self.lane {
            return false;
        }
        self.lane = lane;
        self.snap();
        true
    }

    fn snap(&mut self) {
        let target = self.lane as f32 * self.lane_width + (self.lane_width - self.character_width) / 2.0;
        self.x = self.clamp_x(target);
    }

    fn clamp_x(&self, x: f32) -> f32 {
        let max = (self.board_width - self.character_width).max(0.0);
        x.clamp(0.0, max)
    }
}

fn accepts_input(session: &GameSession) -> bool {
    session.is_game_started && !session.is_paused && !session.is_game_over
}
