//! Game session: score, elapsed time, speed progression, pause/over flags and the league.

use crate::league::{League, LeagueConfig, SPEED_MILESTONES};
use crate::scheduler::{CancelToken, Scheduler, Task};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// How long the indestructible power-up lasts.
pub const INDESTRUCTIBLE_DURATION: Duration = Duration::from_secs(5);

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameTime {
    pub minutes: u32,
    pub seconds: u32,
}

impl GameTime {
    pub fn total_seconds(&self) -> u32 {
        self.minutes * 60 + self.seconds
    }

    fn tick(&mut self) {
        self.seconds += 1;
        if self.seconds >= 60 {
            self.seconds = 0;
            self.minutes += 1;
        }
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

#[derive(Debug)]
pub struct GameSession {
    pub score: u32,
    pub time: GameTime,
    pub game_speed: f32,
    league: League,
    pub points_per_match: u32,
    pub is_paused: bool,
    pub is_game_over: bool,
    pub is_game_started: bool,
    reached_speed_milestones: BTreeSet<u32>,
    indestructible_remaining: Duration,
    clock: Option<CancelToken>,
}

impl GameSession {
    pub fn new(league: League) -> Self {
        let cfg = league.config();
        Self {
            score: 0,
            time: GameTime::default(),
            game_speed: cfg.initial_speed,
            league,
            points_per_match: cfg.points_per_match,
            is_paused: false,
            is_game_over: false,
            is_game_started: false,
            reached_speed_milestones: BTreeSet::new(),
            indestructible_remaining: Duration::ZERO,
            clock: None,
        }
    }

    pub fn league(&self) -> League {
        self.league
    }

    pub fn config(&self) -> &'static LeagueConfig {
        self.league.config()
    }

    /// Started, not paused and not over.
    pub fn is_running(&self) -> bool {
        self.is_game_started && !self.is_paused && !self.is_game_over
    }

    pub fn duration_seconds(&self) -> u32 {
        self.time.total_seconds()
    }

    #[cfg(test)]
    pub fn reached_milestones(&self) -> &BTreeSet<u32> {
        &self.reached_speed_milestones
    }

    /// Sets the started flag and begins the one-second clock (once).
    pub fn start_game<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.is_game_started = true;
        if self.clock.is_none() {
            self.clock = Some(scheduler.schedule(Task::ClockTick, CLOCK_INTERVAL));
        }
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_paused = false;
    }

    pub fn stop_clock<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(token) = self.clock.take() {
            scheduler.cancel(token);
        }
    }

    pub fn set_game_over<S: Scheduler + ?Sized>(&mut self, value: bool, scheduler: &mut S) {
        self.is_game_over = value;
        if value {
            self.stop_clock(scheduler);
            info!(
                "game over: score {} after {} ({} league)",
                self.score, self.time, self.league
            );
        }
    }

    /// One clock second. Returns the new speed if a milestone was crossed.
    pub fn tick_clock(&mut self) -> Option<f32> {
        if !self.is_running() {
            return None;
        }
        self.time.tick();
        self.apply_speed_milestones(self.time.total_seconds())
    }

    /// Raises the speed once for every milestone ≤ `total_seconds` not reached before.
    pub fn apply_speed_milestones(&mut self, total_seconds: u32) -> Option<f32> {
        let increment = self.config().speed_increment;
        let mut raised = false;
        for threshold in SPEED_MILESTONES {
            if threshold > total_seconds {
                break;
            }
            if self.reached_speed_milestones.insert(threshold) {
                self.game_speed += increment;
                raised = true;
            }
        }
        if raised {
            debug!("speed raised to {:.2} at {}s", self.game_speed, total_seconds);
            Some(self.game_speed)
        } else {
            None
        }
    }

    /// Adds the points for a match. Ignored while paused, over or not started.
    pub fn increment_score(&mut self, shape_match: bool, color_match: bool, double_points: bool) -> u32 {
        if !self.is_running() {
            return 0;
        }
        let points = crate::scoring::award_points(
            self.points_per_match,
            shape_match,
            color_match,
            double_points,
        );
        self.score = self.score.saturating_add(points);
        points
    }

    pub fn activate_indestructible(&mut self) {
        self.indestructible_remaining = INDESTRUCTIBLE_DURATION;
    }

    pub fn is_indestructible(&self) -> bool {
        !self.indestructible_remaining.is_zero()
    }

    pub fn indestructible_remaining(&self) -> Duration {
        self.indestructible_remaining
    }

    /// Counts timed power-ups down; time only passes while running.
    pub fn tick_power_ups(&mut self, elapsed: Duration) {
        if !self.is_running() {
            return;
        }
        self.indestructible_remaining = self.indestructible_remaining.saturating_sub(elapsed);
    }

    /// Back to the league's starting values, clock stopped, all flags cleared.
    pub fn reset_game<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        self.stop_clock(scheduler);
        self.score = 0;
        self.time = GameTime::default();
        self.game_speed = self.config().initial_speed;
        self.reached_speed_milestones.clear();
        self.indestructible_remaining = Duration::ZERO;
        self.is_game_over = false;
        self.is_paused = false;
        self.is_game_started = false;
    }

    pub fn set_league_level(&mut self, league: League) {
        let cfg = league.config();
        self.league = league;
        self.game_speed = cfg.initial_speed;
        self.points_per_match = cfg.points_per_match;
        self.reached_speed_milestones.clear();
    }
}
