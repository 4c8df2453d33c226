//! Tilerush: shape-matching lane runner in the terminal.

mod animator;
mod app;
mod board;
mod collision;
mod events;
mod generator;
mod input;
mod league;
mod movement;
mod runtime;
mod scheduler;
mod scoring;
mod session;
mod sound;
mod store;
mod theme;
mod tile;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use league::League;
use std::path::PathBuf;
use std::time::Duration;
use store::{FileStore, ScoreStore};

/// Options derived from CLI and the saved profile that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub league: League,
    pub username: String,
    pub seed: Option<u64>,
    pub frame_interval: Duration,
    pub collision_interval: Duration,
    pub sound: bool,
    pub animations: bool,
    pub no_menu: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(e) = init_logging(args.log_file.clone()) {
        eprintln!("tilerush: logging disabled: {e:#}");
    }
    let store = FileStore::open_default();
    log::debug!("data directory {}", store.dir().display());
    let profile = store.load_profile().unwrap_or_else(|e| {
        log::warn!("profile unreadable, using defaults: {e}");
        store::Profile::default()
    });
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme not loaded: {e}");
        theme::Theme::default()
    });
    let sound_pref = profile.sound_enabled;
    let config = GameConfig {
        league: args.league.unwrap_or(profile.league),
        username: args.username.clone().unwrap_or(profile.username),
        seed: args.seed,
        frame_interval: Duration::from_millis(args.frame_ms.max(1)),
        collision_interval: Duration::from_millis(args.collision_interval_ms.max(1)),
        sound: !args.no_sound && profile.sound_enabled,
        animations: !args.no_animation,
        no_menu: args.no_menu,
    };
    log::info!(
        "starting as {} in the {} league (seed {:?})",
        config.username,
        config.league,
        config.seed
    );
    let mut app = App::new(config, theme, Box::new(store), sound_pref);
    app.run().context("terminal session failed")?;
    Ok(())
}

/// The terminal owns stdout, so logs go to a file. Filter with `TILERUSH_LOG`.
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| store::config_dir().join("tilerush.log"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("TILERUSH_LOG", "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already installed")?;
    Ok(())
}

/// Shape-matching lane runner in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tilerush",
    version,
    about = "Shape-matching lane runner in the terminal. Catch tiles that share your shape or colour.",
    long_about = "Tilerush is a terminal arcade game.\n\n\
        Rows of tiles scroll down towards your character. Steer into a tile that shares your \
        shape or your colour to score; anything else ends the round. Every catch reshapes \
        or recolours you, power-up tiles bend the rules, and the rows speed up over time.\n\n\
        CONTROLS:\n  Left/Right, h/l, a/d  Change lane    1-9  Jump to lane\n  \
        P  Pause    R  Restart    M  Sound    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// League: easy, medium, hard or legend. Defaults to the saved profile's league.
    #[arg(short, long)]
    pub league: Option<League>,

    /// Name recorded with finished games. Defaults to the saved profile's name.
    #[arg(short, long, value_name = "NAME")]
    pub username: Option<String>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for tile generation; random when not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Animation frame interval in ms.
    #[arg(long, default_value = "16", value_name = "MS")]
    pub frame_ms: u64,

    /// Collision sampling interval in ms.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub collision_interval_ms: u64,

    /// Mute sound cues (terminal bell).
    #[arg(long)]
    pub no_sound: bool,

    /// Disable explosion and game-over fade effects.
    #[arg(long)]
    pub no_animation: bool,

    /// Log file. Defaults to tilerush.log in the config directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_league_and_intervals() {
        let args = Args::try_parse_from([
            "tilerush",
            "--league",
            "hard",
            "--frame-ms",
            "20",
            "--palette",
            "colourblind",
        ])
        .unwrap();
        assert_eq!(args.league, Some(League::Hard));
        assert_eq!(args.frame_ms, 20);
        assert_eq!(args.collision_interval_ms, 100);
        assert_eq!(args.palette, Palette::Colorblind);
    }

    #[test]
    fn unknown_league_is_rejected() {
        assert!(Args::try_parse_from(["tilerush", "--league", "platinum"]).is_err());
    }

    #[test]
    fn logging_setup_reports_an_unusable_path() {
        let blocker = std::env::temp_dir().join(format!("tilerush-log-{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();
        let err = init_logging(Some(blocker.join("tilerush.log"))).unwrap_err();
        assert!(format!("{err:#}").contains("cannot create"));
        let _ = std::fs::remove_file(&blocker);
    }
}
