use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoardSettings {
    pub width: usize,
    pub height: usize,
    pub max_extra_columns: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            width: 10,
            height: 20,
            max_extra_columns: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingSettings {
    pub base_gravity_ms: u64,
    pub min_gravity_ms: u64,
    pub soft_drop_ms: u64,
    pub lock_delay_ms: u64,
    pub hold_cooldown_ms: u64,
    pub telegraph_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            base_gravity_ms: 1000,
            min_gravity_ms: 120,
            soft_drop_ms: 40,
            lock_delay_ms: 500,
            hold_cooldown_ms: 500,
            telegraph_delay_ms: 600,
        }
    }
}

impl TimingSettings {
    /// Fall interval for `level` after `speed_up` accumulated speed-up levels.
    pub fn gravity_interval(&self, level: u32, speed_up: f32) -> Duration {
        let base = self.base_gravity_ms as f64
            * 0.9f64.powi(level.saturating_sub(1) as i32)
            * 0.85f64.powf(speed_up.max(0.0) as f64);
        let ms = (base.floor() as u64).max(self.min_gravity_ms);
        Duration::from_millis(ms)
    }

    pub fn soft_drop_interval(&self) -> Duration {
        Duration::from_millis(self.soft_drop_ms)
    }

    pub fn lock_delay(&self) -> Duration {
        Duration::from_millis(self.lock_delay_ms)
    }

    pub fn hold_cooldown(&self) -> Duration {
        Duration::from_millis(self.hold_cooldown_ms)
    }

    pub fn telegraph_delay(&self) -> Duration {
        Duration::from_millis(self.telegraph_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObstacleSettings {
    pub enabled: bool,
    pub piece_interval: u32,
    pub base_level: u8,
    pub score_multiplier: u64,
}

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            piece_interval: 4,
            base_level: 2,
            score_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EconomySettings {
    pub offer_size: usize,
    pub gravity_base_cost: u32,
    pub second_chance_rows: usize,
    pub min_permanent_pool: usize,
    pub reset_pool_size: usize,
    /// Locks a piece may sit in the first and second timed hold cell before it is returned.
    pub extra_hold_turns: [u32; 2],
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            offer_size: 3,
            gravity_base_cost: 10,
            second_chance_rows: 3,
            min_permanent_pool: 4,
            reset_pool_size: 10,
            extra_hold_turns: [3, 5],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CueSettings {
    pub warning_tone: bool,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self { warning_tone: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub board: BoardSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub obstacles: ObstacleSettings,
    #[serde(default)]
    pub economy: EconomySettings,
    #[serde(default)]
    pub cues: CueSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            board: BoardSettings::default(),
            timing: TimingSettings::default(),
            obstacles: ObstacleSettings::default(),
            economy: EconomySettings::default(),
            cues: CueSettings::default(),
        }
    }
}

impl GameConfig {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.board.width = self.board.width.clamp(4, 40);
        self.board.height = self.board.height.clamp(4, 60);
        self.board.max_extra_columns = self.board.max_extra_columns.min(20);
        self.timing.min_gravity_ms = self.timing.min_gravity_ms.max(1);
        self.timing.base_gravity_ms = self.timing.base_gravity_ms.max(self.timing.min_gravity_ms);
        self.timing.soft_drop_ms = self.timing.soft_drop_ms.max(1);
        self.obstacles.piece_interval = self.obstacles.piece_interval.max(1);
        self.obstacles.base_level = self.obstacles.base_level.max(2);
        self.obstacles.score_multiplier = self.obstacles.score_multiplier.max(1);
        self.economy.offer_size = self.economy.offer_size.clamp(1, 6);
        self.economy.gravity_base_cost = self.economy.gravity_base_cost.max(1);
        self.economy.min_permanent_pool = self.economy.min_permanent_pool.max(1);
        self.economy.reset_pool_size = self
            .economy
            .reset_pool_size
            .max(self.economy.min_permanent_pool);
        for turns in &mut self.economy.extra_hold_turns {
            *turns = (*turns).max(1);
        }
        self
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("ROGUETRIS_CONFIG_PATH") {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("roguetris");
        path.push("config.json");
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> GameConfig {
        let Ok(bytes) = fs::read(&self.path) else {
            log::debug!("no config at {}, using defaults", self.path.display());
            return GameConfig::default();
        };
        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                log::warn!("ignoring malformed config {}: {e}", self.path.display());
                GameConfig::default()
            }
        }
    }

    pub fn save(&self, config: &GameConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_interval_follows_level_and_speed_up() {
        let t = TimingSettings::default();
        assert_eq!(t.gravity_interval(1, 0.0), Duration::from_millis(1000));
        assert_eq!(t.gravity_interval(2, 0.0), Duration::from_millis(900));
        assert_eq!(t.gravity_interval(1, 1.0), Duration::from_millis(850));
        assert_eq!(t.gravity_interval(40, 10.0), Duration::from_millis(120));
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let mut config = GameConfig::default();
        config.board.width = 1;
        config.obstacles.base_level = 0;
        config.economy.offer_size = 0;
        config.version = 42;
        let config = config.sanitized();
        assert_eq!(config.board.width, 4);
        assert_eq!(config.obstacles.base_level, 2);
        assert_eq!(config.economy.offer_size, 1);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"board":{"width":12,"height":22,"max_extra_columns":3}}"#)
                .unwrap();
        assert_eq!(config.board.width, 12);
        assert_eq!(config.timing, TimingSettings::default());
        assert!(config.obstacles.enabled);
    }

    #[test]
    fn partial_section_keeps_its_other_defaults() {
        let config: GameConfig = serde_json::from_str(
            r#"{"timing":{"lock_delay_ms":400},"economy":{"extra_hold_turns":[2,4]}}"#,
        )
        .unwrap();
        assert_eq!(config.timing.lock_delay_ms, 400);
        assert_eq!(config.timing.hold_cooldown_ms, 500);
        assert_eq!(config.timing.base_gravity_ms, 1000);
        assert_eq!(config.economy.extra_hold_turns, [2, 4]);
        assert_eq!(config.economy.offer_size, 3);
    }

    #[test]
    fn store_load_accepts_a_partial_section() {
        let dir = std::env::temp_dir().join(format!("roguetris_config_{}", std::process::id()));
        let store = ConfigStore::new(dir.join("config.json"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(store.path(), r#"{"obstacles":{"enabled":false}}"#).unwrap();

        let config = store.load();
        assert!(!config.obstacles.enabled);
        assert_eq!(config.obstacles.piece_interval, 4);
        assert_eq!(config.board, BoardSettings::default());

        let _ = fs::remove_dir_all(dir);
    }
}
