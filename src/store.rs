//! Persist finished games, league rankings and the player profile as JSON
//! (XDG config or ~/.config/tilerush).

use crate::league::League;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SESSIONS_FILE: &str = "sessions.json";
const PROFILE_FILE: &str = "profile.json";

/// Rankings shown per league.
pub const LEAGUE_RANKING_LIST_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub username: String,
    pub league: League,
    pub score: u32,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub position: usize,
    pub username: String,
    pub score: u32,
    pub league: League,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default, deserialize_with = "league_or_default")]
    pub league: League,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// An unknown league name in the profile is logged and skipped, not fatal.
fn league_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<League, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(name.parse().unwrap_or_else(|e| {
        warn!("{e}; using {}", League::default());
        League::default()
    }))
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            username: std::env::var("USER").unwrap_or_else(|_| "player".to_string()),
            league: League::default(),
            sound_enabled: true,
        }
    }
}

pub trait ScoreStore {
    fn save_game_session(&mut self, record: &SessionRecord) -> Result<(), StoreError>;
    /// Best score per player in `league`, highest first, at most `limit` entries.
    fn league_rankings(&self, league: League, limit: usize) -> Result<Vec<RankingEntry>, StoreError>;
    fn load_profile(&self) -> Result<Profile, StoreError>;
    fn save_profile(&mut self, profile: &Profile) -> Result<(), StoreError>;
}

/// Default config directory (config dir / tilerush).
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("tilerush")
}

/// JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open_default() -> Self {
        Self::new(config_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let path = self.dir.join(SESSIONS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(self.dir.join(file), data)?;
        Ok(())
    }
}

impl ScoreStore for FileStore {
    fn save_game_session(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.load_sessions()?;
        sessions.push(record.clone());
        self.write_json(SESSIONS_FILE, &sessions)
    }

    fn league_rankings(&self, league: League, limit: usize) -> Result<Vec<RankingEntry>, StoreError> {
        let sessions = self.load_sessions()?;
        Ok(rank(&sessions, league, limit))
    }

    fn load_profile(&self) -> Result<Profile, StoreError> {
        let path = self.dir.join(PROFILE_FILE);
        if !path.exists() {
            return Ok(Profile::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_profile(&mut self, profile: &Profile) -> Result<(), StoreError> {
        self.write_json(PROFILE_FILE, profile)
    }
}

/// Best score per player in `league`, highest first; ties keep the earlier record first.
pub fn rank(sessions: &[SessionRecord], league: League, limit: usize) -> Vec<RankingEntry> {
    let mut best: HashMap<&str, (u32, usize)> = HashMap::new();
    for (i, s) in sessions.iter().enumerate().filter(|(_, s)| s.league == league) {
        let entry = best.entry(s.username.as_str()).or_insert((s.score, i));
        if s.score > entry.0 {
            *entry = (s.score, i);
        }
    }
    let mut sorted: Vec<(&str, u32, usize)> =
        best.into_iter().map(|(name, (score, i))| (name, score, i)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (name, score, _))| RankingEntry {
            position: i + 1,
            username: name.to_string(),
            score,
            league,
        })
        .collect()
}
