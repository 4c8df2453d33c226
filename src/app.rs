//! App: terminal init, main loop, game events and key handling.

use crate::GameConfig;
use crate::events::GameEvent;
use crate::input::{Action, key_to_action};
use crate::league::League;
use crate::runtime::{GameRuntime, RuntimeConfig};
use crate::scheduler::WallScheduler;
use crate::session::GameTime;
use crate::sound::{Silent, SoundService, TerminalBell};
use crate::store::{LEAGUE_RANKING_LIST_LIMIT, Profile, RankingEntry, ScoreStore, SessionRecord};
use crate::theme::Theme;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

/// How long a character message stays in the sidebar.
const BANNER_DURATION: Duration = Duration::from_millis(1200);
/// Upper bound on one loop iteration (input poll timeout).
const LOOP_BUDGET: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::MainMenu,
            Self::MainMenu => Self::Exit,
            Self::Exit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Exit,
            Self::MainMenu => Self::Resume,
            Self::Exit => Self::MainMenu,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub selected_league: League,
    pub rankings: Vec<RankingEntry>,
}

/// What the game-over screen reports about the round that just ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub score: u32,
    pub time: GameTime,
    pub league: League,
    pub rank: Option<usize>,
    pub promoted_to: Option<League>,
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub text: String,
    pub until: Instant,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    store: Box<dyn ScoreStore>,
    runtime: GameRuntime<WallScheduler>,
    screen: Screen,
    quit_selected: QuitOption,
    menu_state: MenuState,
    summary: Option<RoundSummary>,
    banner: Option<Banner>,
    effects: ui::Effects,
    /// Best score in the current league, for the sidebar.
    best: u32,
    /// Stored sound preference; `--no-sound` mutes a run without changing it.
    sound_pref: bool,
}

fn sound_service(enabled: bool) -> Box<dyn SoundService> {
    if enabled {
        Box::new(TerminalBell)
    } else {
        Box::new(Silent)
    }
}

impl App {
    /// `sound_pref` is the saved preference; `config.sound` may still mute this run.
    pub fn new(config: GameConfig, theme: Theme, store: Box<dyn ScoreStore>, sound_pref: bool) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let runtime_config = RuntimeConfig {
            frame_interval: config.frame_interval,
            collision_interval: config.collision_interval,
            ..RuntimeConfig::new(config.league, theme.tile_palette())
        };
        let mut runtime = GameRuntime::new(
            runtime_config,
            WallScheduler::new(),
            sound_service(config.sound),
            rng,
        );
        runtime.events().subscribe(|event| match event {
            GameEvent::SpeedIncreased { speed } => info!("speed raised to {speed:.1}"),
            GameEvent::GameOver {
                score,
                duration_seconds,
            } => info!("round over: {score} points in {duration_seconds}s"),
            _ => {}
        });
        let screen = if config.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let mut app = Self {
            menu_state: MenuState {
                selected_league: config.league,
                rankings: Vec::new(),
            },
            config,
            theme,
            store,
            runtime,
            screen,
            quit_selected: QuitOption::Resume,
            summary: None,
            banner: None,
            effects: ui::Effects::default(),
            best: 0,
            sound_pref,
        };
        app.refresh_rankings();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        self.sync_geometry();
        if self.screen == Screen::Playing {
            self.runtime.start_game();
        }

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.sync_geometry();
            self.runtime.pump();
            self.handle_game_events(now);
            if self.banner.as_ref().is_some_and(|b| now >= b.until) {
                self.banner = None;
            }

            let view = ui::View {
                screen: self.screen,
                theme: &self.theme,
                session: self.runtime.session(),
                board: self.runtime.board(),
                character: self.runtime.character(),
                character_x: self.runtime.movement().x(),
                geometry: self.runtime.geometry(),
                menu: &self.menu_state,
                summary: self.summary.as_ref(),
                banner: self.banner.as_ref().map(|b| b.text.as_str()),
                quit_selected: self.quit_selected,
                username: &self.config.username,
                best: self.best,
                now,
            };
            let effects = &mut self.effects;
            terminal.draw(|f| ui::draw(f, &view, effects))?;

            let timeout = LOOP_BUDGET.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle_action(key_to_action(key)) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Re-measures the board from the terminal size and remounts on change.
    fn sync_geometry(&mut self) {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let cfg = self.runtime.session().config();
        let geometry = ui::board_geometry(
            Rect::new(0, 0, cols, rows),
            cfg.tiles_per_row,
            cfg.tile_size,
        );
        match geometry {
            Some(g) if self.runtime.geometry() != Some(&g) => self.runtime.mount(g),
            Some(_) => {}
            None if self.runtime.geometry().is_some() => {
                warn!("terminal too small ({cols}x{rows}); board unmounted");
                self.runtime.unmount();
            }
            None => {}
        }
    }

    fn handle_game_events(&mut self, now: Instant) {
        let events: Vec<GameEvent> = self.runtime.events().drain().collect();
        for event in events {
            match event {
                GameEvent::TileRowReset { row } => self.effects.forget_row(row),
                GameEvent::CharacterMessage { points, power_up } => {
                    let text = if power_up {
                        format!("+{points} power-up!")
                    } else {
                        format!("+{points}")
                    };
                    self.show_banner(text, now);
                }
                GameEvent::TileExplosion { tiles, .. } => {
                    if self.config.animations {
                        self.effects.explode(tiles);
                    } else {
                        self.effects.hide(tiles);
                    }
                }
                GameEvent::SpeedIncreased { speed } => {
                    self.show_banner(format!("Speed up! {speed:.1}"), now);
                }
                GameEvent::Celebrate { score } => {
                    self.show_banner(format!("★ {score} points! ★"), now);
                }
                GameEvent::GameOver {
                    score,
                    duration_seconds,
                } => self.finish_round(score, duration_seconds),
            }
        }
    }

    fn show_banner(&mut self, text: String, now: Instant) {
        self.banner = Some(Banner {
            text,
            until: now + BANNER_DURATION,
        });
    }

    /// Records the round, applies promotion and switches to the game-over screen.
    fn finish_round(&mut self, score: u32, duration_seconds: u32) {
        let league = self.runtime.session().league();
        let record = SessionRecord {
            username: self.config.username.clone(),
            league,
            score,
            duration_seconds,
        };
        if let Err(e) = self.store.save_game_session(&record) {
            warn!("could not save game session: {e}");
        }
        let rankings = self
            .store
            .league_rankings(league, LEAGUE_RANKING_LIST_LIMIT)
            .unwrap_or_else(|e| {
                warn!("could not load rankings: {e}");
                Vec::new()
            });
        let rank = rankings
            .iter()
            .find(|r| r.username == self.config.username && r.score == score)
            .map(|r| r.position);
        let promoted_to = league.promotion_for(score);
        if let Some(next) = promoted_to {
            info!("{} promoted from {league} to {next}", self.config.username);
            self.config.league = next;
            self.menu_state.selected_league = next;
            self.save_profile();
        }
        self.best = self.best.max(score);
        self.summary = Some(RoundSummary {
            score,
            time: self.runtime.session().time,
            league,
            rank,
            promoted_to,
        });
        if self.config.animations {
            self.effects.fade_board();
        }
        self.screen = Screen::GameOver;
    }

    fn save_profile(&mut self) {
        let profile = Profile {
            username: self.config.username.clone(),
            league: self.config.league,
            sound_enabled: self.sound_pref,
        };
        if let Err(e) = self.store.save_profile(&profile) {
            warn!("could not save profile: {e}");
        }
    }

    fn refresh_rankings(&mut self) {
        let league = self.menu_state.selected_league;
        self.menu_state.rankings = self
            .store
            .league_rankings(league, LEAGUE_RANKING_LIST_LIMIT)
            .unwrap_or_else(|e| {
                warn!("could not load rankings: {e}");
                Vec::new()
            });
        self.best = self.menu_state.rankings.first().map_or(0, |r| r.score);
    }

    /// Starts a fresh round in the configured league.
    fn start_round(&mut self) {
        if self.runtime.session().league() != self.config.league {
            self.runtime.set_league_level(self.config.league);
            self.sync_geometry();
        } else {
            self.runtime.reset_game();
        }
        self.effects.clear();
        self.banner = None;
        self.summary = None;
        self.runtime.start_game();
        self.screen = Screen::Playing;
    }

    fn open_menu(&mut self) {
        self.runtime.reset_game();
        self.effects.clear();
        self.menu_state.selected_league = self.config.league;
        self.refresh_rankings();
        self.screen = Screen::Menu;
    }

    /// Returns false when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return false,
                Action::MoveLeft | Action::Up => self.select_league(self.menu_state.selected_league.prev()),
                Action::MoveRight | Action::Down => self.select_league(self.menu_state.selected_league.next()),
                Action::Lane(i) => self.select_league(League::ALL.get(i).copied()),
                Action::ToggleSound => self.toggle_sound(),
                Action::Confirm => {
                    self.config.league = self.menu_state.selected_league;
                    self.save_profile();
                    self.refresh_rankings();
                    self.start_round();
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Pause => self.runtime.toggle_pause(),
                Action::Quit => {
                    self.runtime.pause();
                    self.quit_selected = QuitOption::Resume;
                    self.screen = Screen::QuitMenu;
                }
                Action::MoveLeft => {
                    self.runtime.move_left();
                }
                Action::MoveRight => {
                    self.runtime.move_right();
                }
                Action::Lane(i) => {
                    self.runtime.move_to_lane(i);
                }
                Action::Restart => self.start_round(),
                Action::ToggleSound => self.toggle_sound(),
                _ => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::MoveRight => self.quit_selected = self.quit_selected.next(),
                Action::Up | Action::MoveLeft => self.quit_selected = self.quit_selected.prev(),
                Action::Confirm => match self.quit_selected {
                    QuitOption::Resume => self.resume_from_quit_menu(),
                    QuitOption::MainMenu => self.open_menu(),
                    QuitOption::Exit => return false,
                },
                Action::Pause | Action::Quit => self.resume_from_quit_menu(),
                _ => {}
            },
            Screen::GameOver => match action {
                Action::Quit => return false,
                Action::Restart => self.start_round(),
                Action::Confirm => self.open_menu(),
                _ => {}
            },
        }
        true
    }

    fn toggle_sound(&mut self) {
        self.config.sound = !self.config.sound;
        self.sound_pref = self.config.sound;
        self.runtime.set_sound(sound_service(self.config.sound));
        self.save_profile();
        info!("sound {}", if self.config.sound { "on" } else { "off" });
    }

    fn select_league(&mut self, league: Option<League>) {
        if let Some(league) = league {
            self.menu_state.selected_league = league;
            self.refresh_rankings();
        }
    }

    fn resume_from_quit_menu(&mut self) {
        self.runtime.resume();
        self.screen = Screen::Playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct MemoryStore {
        profile_loads: Rc<Cell<usize>>,
        saved: Rc<RefCell<Vec<Profile>>>,
    }

    impl ScoreStore for MemoryStore {
        fn save_game_session(&mut self, _: &SessionRecord) -> Result<(), StoreError> {
            Ok(())
        }

        fn league_rankings(&self, _: League, _: usize) -> Result<Vec<RankingEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn load_profile(&self) -> Result<Profile, StoreError> {
            self.profile_loads.set(self.profile_loads.get() + 1);
            Err(StoreError::Io(std::io::Error::other("unreadable")))
        }

        fn save_profile(&mut self, profile: &Profile) -> Result<(), StoreError> {
            self.saved.borrow_mut().push(profile.clone());
            Ok(())
        }
    }

    fn config(sound: bool) -> GameConfig {
        GameConfig {
            league: League::Medium,
            username: "ana".to_string(),
            seed: Some(7),
            frame_interval: Duration::from_millis(16),
            collision_interval: Duration::from_millis(100),
            sound,
            animations: false,
            no_menu: false,
        }
    }

    #[test]
    fn sound_preference_comes_from_the_caller() {
        let store = MemoryStore::default();
        let mut app = App::new(config(false), Theme::default(), Box::new(store.clone()), false);
        assert_eq!(store.profile_loads.get(), 0);

        app.toggle_sound();
        let saved = store.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].sound_enabled);
        assert_eq!(saved[0].league, League::Medium);
    }

    #[test]
    fn muted_run_keeps_the_saved_preference() {
        let store = MemoryStore::default();
        let mut app = App::new(config(false), Theme::default(), Box::new(store.clone()), true);
        app.save_profile();
        assert!(store.saved.borrow()[0].sound_enabled);
    }
}
