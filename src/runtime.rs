//! The game context: owns the board, session, character and collaborators, and dispatches
//! scheduler tasks to them. The terminal shell only mounts geometry, forwards input and pumps.

use crate::animator::{DEFAULT_FRAME_INTERVAL, RowAnimator};
use crate::board::{Board, BoardGeometry};
use crate::collision::{CollisionDetector, DEFAULT_CHECK_INTERVAL};
use crate::events::{EventBus, GameEvent};
use crate::generator::{PALETTE_SIZE, TileGenerator};
use crate::league::League;
use crate::movement::MovementController;
use crate::scheduler::{Scheduler, Task};
use crate::scoring::evaluate;
use crate::session::GameSession;
use crate::sound::{SoundCue, SoundService, play_cue};
use crate::tile::{Character, ColorPair, RowId, TileId};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub league: League,
    pub palette: [ColorPair; PALETTE_SIZE],
    pub frame_interval: Duration,
    pub collision_interval: Duration,
}

impl RuntimeConfig {
    pub fn new(league: League, palette: [ColorPair; PALETTE_SIZE]) -> Self {
        Self {
            league,
            palette,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            collision_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

pub struct GameRuntime<S: Scheduler> {
    session: GameSession,
    board: Board,
    collision: CollisionDetector,
    animator: RowAnimator,
    generator: TileGenerator,
    movement: MovementController,
    character: Character,
    bus: EventBus,
    scheduler: S,
    sound: Box<dyn SoundService>,
    rng: StdRng,
    geometry: Option<BoardGeometry>,
    frame_interval: Duration,
    collision_interval: Duration,
    /// Scheduler time of the previous animation frame.
    last_frame: Option<Duration>,
    celebrated: bool,
}

impl<S: Scheduler> GameRuntime<S> {
    pub fn new(config: RuntimeConfig, scheduler: S, sound: Box<dyn SoundService>, mut rng: StdRng) -> Self {
        let cfg = config.league.config();
        let character = Character::random(&mut rng, &config.palette, cfg.tile_size);
        Self {
            session: GameSession::new(config.league),
            board: Board::default(),
            collision: CollisionDetector::new(),
            animator: RowAnimator::new(),
            generator: TileGenerator::new(config.palette, cfg.tiles_per_row, cfg.tile_size),
            movement: MovementController::new(),
            character,
            bus: EventBus::new(),
            scheduler,
            sound,
            rng,
            geometry: None,
            frame_interval: config.frame_interval,
            collision_interval: config.collision_interval,
            last_frame: None,
            celebrated: false,
        }
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn movement(&self) -> &MovementController {
        &self.movement
    }

    pub fn geometry(&self) -> Option<&BoardGeometry> {
        self.geometry.as_ref()
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    #[cfg(test)]
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn set_sound(&mut self, sound: Box<dyn SoundService>) {
        self.sound = sound;
    }

    /// Attaches (or re-measures) the render target. Lanes and tile size always follow the
    /// league. Before the game starts the rows are rebuilt to fit; mid-game only the
    /// character is re-synced.
    pub fn mount(&mut self, geometry: BoardGeometry) {
        let cfg = self.session.config();
        let geometry = BoardGeometry::new(
            cfg.tiles_per_row,
            geometry.lane_width,
            geometry.container_height,
            cfg.tile_size,
        );
        let first = self.geometry.is_none();
        self.geometry = Some(geometry);
        self.movement.resize(&geometry);
        if first {
            self.movement.center();
        }
        if !self.session.is_game_started {
            self.rebuild_board();
        }
        self.sync_hit_area();
        debug!(
            "mounted {} lanes x {:.0}px, container {:.0}px",
            geometry.lanes, geometry.lane_width, geometry.container_height
        );
    }

    pub fn unmount(&mut self) {
        self.geometry = None;
        self.collision.set_character_hit_area(None);
    }

    pub fn start_game(&mut self) {
        if self.session.is_game_over {
            debug!("start ignored: game is over, reset first");
            return;
        }
        if self.geometry.is_none() {
            debug!("starting without a mounted board; nothing moves until mount");
        }
        self.session.start_game(&mut self.scheduler);
        if self.last_frame.is_none() {
            self.last_frame = Some(self.scheduler.now());
        }
        self.animator
            .start(&mut self.board, &mut self.scheduler, self.frame_interval);
        if !self.collision.is_checking() {
            self.collision
                .start_checking(&mut self.scheduler, self.collision_interval);
        }
        info!("game started ({} league)", self.session.league());
    }

    pub fn pause(&mut self) {
        self.session.pause();
    }

    pub fn resume(&mut self) {
        self.session.resume();
    }

    pub fn toggle_pause(&mut self) {
        if self.session.is_paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Back to a fresh, unstarted round: new character, fresh rows, timers stopped.
    pub fn reset_game(&mut self) {
        self.session.reset_game(&mut self.scheduler);
        self.animator.stop(&mut self.scheduler);
        self.last_frame = None;
        self.collision.stop_checking(&mut self.scheduler);
        self.collision.clear_all();
        let cfg = self.session.config();
        self.generator.configure(cfg.tiles_per_row, cfg.tile_size);
        self.character = Character::random(&mut self.rng, self.generator.palette(), cfg.tile_size);
        self.celebrated = false;
        if let Some(g) = self.geometry {
            self.mount(g);
            self.movement.center();
            self.sync_hit_area();
        } else {
            self.board = Board::default();
        }
    }

    /// Switches league and starts over with its configuration.
    pub fn set_league_level(&mut self, league: League) {
        self.session.set_league_level(league);
        self.reset_game();
        info!("league set to {league}");
    }

    /// Runs every task that is due. Returns how many ran.
    pub fn pump(&mut self) -> usize {
        let due = self.scheduler.poll_due();
        for task in &due {
            match task {
                Task::AnimationFrame => self.on_frame(),
                Task::CollisionPoll => self.on_collision_poll(),
                Task::ClockTick => self.on_clock_tick(),
            }
        }
        due.len()
    }

    /// Timed power-ups count real elapsed time; frames skipped by a slow loop still count,
    /// paused frames do not.
    fn on_frame(&mut self) {
        let now = self.scheduler.now();
        let elapsed = self
            .last_frame
            .replace(now)
            .map_or(self.frame_interval, |prev| now.saturating_sub(prev));
        if !self.session.is_running() {
            return;
        }
        self.session.tick_power_ups(elapsed);
        let resets = self
            .animator
            .step(&mut self.board, self.session.game_speed, self.geometry.as_ref());
        for row in resets {
            self.handle_row_reset(row);
        }
    }

    fn handle_row_reset(&mut self, row: RowId) {
        self.collision.clear_row(row);
        self.generator
            .regenerate_row(&mut self.board, row, &self.character, &mut self.rng);
        self.bus.emit(GameEvent::TileRowReset { row });
    }

    fn on_collision_poll(&mut self) {
        if !self.session.is_running() {
            return;
        }
        let Some(geometry) = self.geometry else {
            return;
        };
        for index in 0..self.board.len() {
            let id = RowId(index);
            let Some(row) = self.board.row(id) else {
                continue;
            };
            if !row.is_scrolling() {
                continue;
            }
            let boxes: Vec<_> = (0..row.tiles.len())
                .map(|i| (i, geometry.tile_hit_box(row.offset, i)))
                .collect();
            if let Some(tile) = self.collision.check_row(id, boxes) {
                self.evaluate_collision(id, tile);
                if self.session.is_game_over {
                    break;
                }
            }
        }
    }

    /// Scores a hit on tile `index` of `row`, or ends the round when it does not match.
    fn evaluate_collision(&mut self, row: RowId, index: usize) {
        let Some(tile) = self.board.tile(row, index).cloned() else {
            debug!("{row}: tile {index} vanished before evaluation");
            return;
        };
        let was_indestructible = self.session.is_indestructible();
        let outcome = evaluate(&tile, &self.character, was_indestructible);
        if !outcome.is_match() {
            debug!("{}: no match", tile.id);
            self.end_round();
            return;
        }

        if outcome.effects.indestructible {
            self.session.activate_indestructible();
        }
        let has_power_up = outcome.effects.any();
        let cue = if has_power_up {
            SoundCue::TilePowerUp
        } else {
            SoundCue::TilePop
        };
        play_cue(self.sound.as_mut(), cue);

        let points = self.session.increment_score(
            outcome.shape_match,
            outcome.color_match,
            outcome.effects.double_points,
        );
        self.character.absorb(&tile, &outcome, &mut self.rng);
        self.collision.disable_row(row);
        self.generator
            .ensure_next_row_reachable(&mut self.board, row, &self.character, &mut self.rng);
        self.bus.emit(GameEvent::CharacterMessage {
            points,
            power_up: has_power_up,
        });

        if was_indestructible {
            self.explode_row(row, tile.id);
        }
        self.maybe_celebrate();
    }

    fn explode_row(&mut self, row: RowId, collided: TileId) {
        let Some(r) = self.board.row(row) else {
            return;
        };
        let tiles: Vec<TileId> = r
            .tiles
            .iter()
            .map(|t| t.id)
            .filter(|id| *id != collided)
            .collect();
        play_cue(self.sound.as_mut(), SoundCue::TileRowExplosion);
        self.bus.emit(GameEvent::TileExplosion { collided, tiles });
    }

    fn maybe_celebrate(&mut self) {
        if self.celebrated || self.session.score < self.session.config().show_confetti_score {
            return;
        }
        self.celebrated = true;
        self.bus.emit(GameEvent::Celebrate {
            score: self.session.score,
        });
    }

    fn end_round(&mut self) {
        self.session.pause();
        self.session.set_game_over(true, &mut self.scheduler);
        self.animator.stop(&mut self.scheduler);
        self.last_frame = None;
        self.collision.stop_checking(&mut self.scheduler);
        play_cue(self.sound.as_mut(), SoundCue::RoundLost);
        self.bus.emit(GameEvent::GameOver {
            score: self.session.score,
            duration_seconds: self.session.duration_seconds(),
        });
    }

    fn on_clock_tick(&mut self) {
        if let Some(speed) = self.session.tick_clock() {
            play_cue(self.sound.as_mut(), SoundCue::SpeedIncrease);
            self.bus.emit(GameEvent::SpeedIncreased { speed });
        }
    }

    pub fn move_left(&mut self) -> bool {
        let moved = self.movement.move_left(&self.session);
        self.after_move(moved)
    }

    pub fn move_right(&mut self) -> bool {
        let moved = self.movement.move_right(&self.session);
        self.after_move(moved)
    }

    pub fn move_to_lane(&mut self, lane: usize) -> bool {
        let moved = self.movement.move_to_lane(lane, &self.session);
        self.after_move(moved)
    }

    fn after_move(&mut self, moved: bool) -> bool {
        if moved {
            play_cue(self.sound.as_mut(), SoundCue::CharacterMove);
            self.sync_hit_area();
            trace!(
                "character in lane {} ({:.0}%)",
                self.movement.lane(),
                self.movement.percent()
            );
        }
        moved
    }

    fn sync_hit_area(&mut self) {
        let hit_area = self
            .geometry
            .map(|g| g.character_hit_box(self.movement.x()));
        self.collision.set_character_hit_area(hit_area);
    }

    /// Enough rows to cover the container plus one waiting above it.
    fn rebuild_board(&mut self) {
        let Some(geometry) = self.geometry else {
            return;
        };
        let cfg = self.session.config();
        let spacing = cfg.initial_row_spacing;
        let count = ((geometry.container_height + geometry.row_height()) / spacing).ceil() as usize + 1;
        self.board = self.generator.generate_board(
            count.max(2),
            geometry.row_height(),
            spacing,
            &self.character,
            &mut self.rng,
        );
        self.collision.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{test_character, test_palette};
    use crate::scheduler::ManualScheduler;
    use crate::sound::tests::Recorder;
    use crate::session::INDESTRUCTIBLE_DURATION;
    use crate::tile::{PowerUp, Shape, TileSize};
    use rand::SeedableRng;

    const POLL: Duration = Duration::from_millis(100);

    fn runtime(league: League) -> (GameRuntime<ManualScheduler>, Recorder) {
        let rec = Recorder::default();
        let mut rt = GameRuntime::new(
            RuntimeConfig::new(league, test_palette()),
            ManualScheduler::new(),
            Box::new(rec.clone()),
            StdRng::seed_from_u64(42),
        );
        rt.mount(BoardGeometry::new(3, 100.0, 600.0, TileSize::Xl));
        rt.character = test_character();
        (rt, rec)
    }

    /// Parks every row far above the container except `row`, which sits on the character.
    fn line_up(rt: &mut GameRuntime<ManualScheduler>, row: usize) {
        for (i, r) in rt.board.rows_mut().iter_mut().enumerate() {
            r.offset = if i == row { 480.0 } else { -2000.0 - i as f32 * 400.0 };
        }
    }

    fn set_row_tiles(rt: &mut GameRuntime<ManualScheduler>, row: usize, tiles: &[(Shape, usize, PowerUp)]) {
        for (tile, &(shape, color, power_up)) in rt.board.rows_mut()[row].tiles.iter_mut().zip(tiles) {
            tile.shape = shape;
            tile.colors = test_palette()[color];
            tile.power_up = power_up;
        }
    }

    fn started_in_lane_zero(league: League) -> (GameRuntime<ManualScheduler>, Recorder) {
        let (mut rt, rec) = runtime(league);
        rt.start_game();
        assert!(rt.move_to_lane(0));
        (rt, rec)
    }

    #[test]
    fn shape_only_match_on_easy_scores_one_and_takes_tile_colours() {
        let (mut rt, rec) = started_in_lane_zero(League::Easy);
        set_row_tiles(
            &mut rt,
            0,
            &[
                (Shape::Circle, 2, PowerUp::None),
                (Shape::Star, 3, PowerUp::None),
                (Shape::Square, 4, PowerUp::None),
            ],
        );
        line_up(&mut rt, 0);
        rt.scheduler_mut().advance(POLL);
        rt.pump();

        assert_eq!(rt.session().score, 1);
        assert_eq!(rt.character().shape, Shape::Circle);
        assert_eq!(rt.character().colors, test_palette()[2]);
        assert!(rt.collision.is_collided(RowId(0)));
        assert!(rec.cues.borrow().contains(&SoundCue::TilePop));
        let events: Vec<GameEvent> = rt.events().drain().collect();
        assert!(events.contains(&GameEvent::CharacterMessage {
            points: 1,
            power_up: false
        }));
        let next = &rt.board().rows()[1];
        assert!(next.tiles.iter().any(|t| t.reachable_by(rt.character())));
    }

    #[test]
    fn miss_ends_the_round_without_scoring() {
        let (mut rt, rec) = started_in_lane_zero(League::Easy);
        set_row_tiles(
            &mut rt,
            0,
            &[
                (Shape::Star, 2, PowerUp::None),
                (Shape::Circle, 0, PowerUp::None),
                (Shape::Circle, 0, PowerUp::None),
            ],
        );
        line_up(&mut rt, 0);
        rt.scheduler_mut().advance(POLL);
        rt.pump();

        assert!(rt.session().is_game_over);
        assert!(rt.session().is_paused);
        assert_eq!(rt.session().score, 0);
        assert_eq!(rt.scheduler_mut().active_timers(), 0);
        assert!(rec.cues.borrow().contains(&SoundCue::RoundLost));
        assert!(rt.events().drain().any(|e| matches!(e, GameEvent::GameOver { score: 0, .. })));
    }

    #[test]
    fn double_points_doubles_a_single_axis_match() {
        let (mut rt, rec) = started_in_lane_zero(League::Hard);
        let ppm = rt.session().points_per_match;
        set_row_tiles(&mut rt, 0, &[(Shape::Circle, 3, PowerUp::DoublePoints)]);
        line_up(&mut rt, 0);
        rt.scheduler_mut().advance(POLL);
        rt.pump();
        assert_eq!(rt.session().score, 2 * ppm);
        assert!(rec.cues.borrow().contains(&SoundCue::TilePowerUp));
    }

    #[test]
    fn indestructible_hit_explodes_the_rest_of_the_row() {
        let (mut rt, rec) = started_in_lane_zero(League::Easy);
        rt.session.activate_indestructible();
        set_row_tiles(
            &mut rt,
            0,
            &[
                (Shape::Star, 2, PowerUp::None),
                (Shape::Star, 2, PowerUp::None),
                (Shape::Star, 2, PowerUp::None),
            ],
        );
        line_up(&mut rt, 0);
        rt.scheduler_mut().advance(POLL);
        rt.pump();

        assert!(!rt.session().is_game_over);
        assert_eq!(rt.session().score, 2);
        assert!(rec.cues.borrow().contains(&SoundCue::TileRowExplosion));
        let explosion = rt
            .events()
            .drain()
            .find(|e| matches!(e, GameEvent::TileExplosion { .. }));
        let Some(GameEvent::TileExplosion { collided, tiles }) = explosion else {
            panic!("no explosion event");
        };
        assert_eq!(collided.index, 0);
        assert_eq!(tiles.len(), 2);
        assert!(!tiles.contains(&collided));
    }

    #[test]
    fn indestructible_power_up_needs_a_match_to_activate() {
        let (mut rt, _) = started_in_lane_zero(League::Easy);
        set_row_tiles(&mut rt, 0, &[(Shape::Star, 2, PowerUp::Indestructible)]);
        line_up(&mut rt, 0);
        rt.scheduler_mut().advance(POLL);
        rt.pump();
        assert!(rt.session().is_game_over);
        assert!(!rt.session().is_indestructible());
    }

    #[test]
    fn row_leaving_the_board_is_regenerated_and_unlatched() {
        let (mut rt, _) = runtime(League::Easy);
        rt.start_game();
        for (i, r) in rt.board.rows_mut().iter_mut().enumerate() {
            r.offset = if i == 0 { 599.0 } else { -200.0 - i as f32 * 400.0 };
        }
        rt.collision.disable_row(RowId(0));
        rt.scheduler_mut().advance(Duration::from_millis(16));
        rt.pump();

        let row = &rt.board().rows()[0];
        assert_eq!(row.generation, 1);
        assert!(row.offset < 0.0);
        assert!(!rt.collision.is_collided(RowId(0)));
        assert!(
            rt.events()
                .drain()
                .any(|e| e == GameEvent::TileRowReset { row: RowId(0) })
        );
    }

    #[test]
    fn paused_frames_leave_rows_in_place() {
        let (mut rt, _) = runtime(League::Easy);
        rt.start_game();
        rt.pause();
        let before: Vec<f32> = rt.board().rows().iter().map(|r| r.offset).collect();
        rt.scheduler_mut().advance(Duration::from_secs(2));
        rt.pump();
        let after: Vec<f32> = rt.board().rows().iter().map(|r| r.offset).collect();
        assert_eq!(before, after);
        assert_eq!(rt.session().time.total_seconds(), 0);
        rt.resume();
        rt.scheduler_mut().advance(Duration::from_millis(16));
        rt.pump();
        assert!(rt.board().rows()[0].offset > before[0]);
    }

    #[test]
    fn clock_raises_speed_at_fifteen_seconds() {
        let (mut rt, rec) = runtime(League::Easy);
        rt.start_game();
        let base = rt.session().game_speed;
        for _ in 0..15 {
            rt.scheduler_mut().advance(Duration::from_secs(1));
            rt.pump();
        }
        assert!(rt.session().game_speed > base);
        assert!(rec.cues.borrow().contains(&SoundCue::SpeedIncrease));
        assert!(
            rt.events()
                .drain()
                .any(|e| matches!(e, GameEvent::SpeedIncreased { .. }))
        );
    }

    #[test]
    fn celebration_fires_once() {
        let (mut rt, _) = started_in_lane_zero(League::Easy);
        rt.session.score = rt.session.config().show_confetti_score;
        rt.maybe_celebrate();
        rt.maybe_celebrate();
        let count = rt
            .events()
            .drain()
            .filter(|e| matches!(e, GameEvent::Celebrate { .. }))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn reset_returns_to_a_fresh_round() {
        let (mut rt, _) = started_in_lane_zero(League::Easy);
        rt.session.score = 7;
        rt.collision.disable_row(RowId(1));
        rt.end_round();
        rt.reset_game();
        assert!(!rt.session().is_game_over && !rt.session().is_game_started);
        assert_eq!(rt.session().score, 0);
        assert_eq!(rt.collision.collided_rows(), 0);
        assert!(rt.board().rows().iter().all(|r| !r.is_scrolling()));
        assert_eq!(rt.movement().lane(), 1);
        rt.start_game();
        assert_eq!(rt.scheduler_mut().active_timers(), 3);
    }

    #[test]
    fn league_change_rebuilds_rows_for_the_new_league() {
        let (mut rt, _) = runtime(League::Easy);
        rt.set_league_level(League::Legend);
        assert_eq!(rt.session().league(), League::Legend);
        assert!(rt.board().rows().iter().all(|r| r.tiles.len() == 6));
        assert_eq!(rt.geometry().map(|g| g.tile_size), Some(TileSize::Sm));
    }

    #[test]
    fn unmounted_runtime_does_not_move_or_collide() {
        let (mut rt, _) = runtime(League::Easy);
        rt.start_game();
        rt.unmount();
        let before: Vec<f32> = rt.board().rows().iter().map(|r| r.offset).collect();
        rt.scheduler_mut().advance(POLL);
        rt.pump();
        let after: Vec<f32> = rt.board().rows().iter().map(|r| r.offset).collect();
        assert_eq!(before, after);
        assert!(!rt.session().is_game_over);
    }

    #[test]
    fn movement_is_ignored_until_started() {
        let (mut rt, rec) = runtime(League::Easy);
        assert!(!rt.move_left());
        rt.start_game();
        assert!(rt.move_left());
        assert!(!rt.move_left());
        assert_eq!(*rec.cues.borrow(), vec![SoundCue::CharacterMove]);
    }

    #[test]
    fn indestructible_counts_real_time_between_frames() {
        let (mut rt, _) = started_in_lane_zero(League::Easy);
        rt.session.activate_indestructible();
        rt.scheduler_mut().advance(Duration::from_secs(1));
        rt.pump();
        assert_eq!(
            rt.session().indestructible_remaining(),
            INDESTRUCTIBLE_DURATION - Duration::from_secs(1)
        );
    }

    #[test]
    fn indestructible_does_not_count_paused_time() {
        let (mut rt, _) = started_in_lane_zero(League::Easy);
        rt.session.activate_indestructible();
        rt.pause();
        rt.scheduler_mut().advance(Duration::from_secs(2));
        rt.pump();
        rt.resume();
        rt.scheduler_mut().advance(Duration::from_millis(16));
        rt.pump();
        assert_eq!(
            rt.session().indestructible_remaining(),
            INDESTRUCTIBLE_DURATION - Duration::from_millis(16)
        );
    }
}
