//! Telegraphed obstacle rows.
//!
//! `Idle -> Telegraphed -> Injected -> Idle`. The row is rolled when it is telegraphed and lives
//! inside the pending `Countdown`; cancelling drops both, so nothing can fire into a later run.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::board::{Board, MIN_INJECTED_OBSTACLE_LEVEL};
use crate::config::ObstacleSettings;
use crate::countdown::{Countdown, Tick};
use crate::signals::{OBSTACLE_WARNING_MESSAGE, Signal, ToneCue};

/// A row waiting to be pushed in from the bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleRow {
    pub pattern: Vec<bool>,
    pub level: u8,
}

impl ObstacleRow {
    pub fn columns(&self) -> Vec<usize> {
        self.pattern
            .iter()
            .enumerate()
            .filter_map(|(c, &on)| on.then_some(c))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstaclePhase {
    Idle,
    Telegraphed(Countdown<ObstacleRow>),
    /// A row landed this tick; `settle` returns to `Idle`.
    Injected,
}

/// Number of obstacle cells in an injected row.
pub fn obstacle_columns_for_level(level: u32, width: usize) -> usize {
    let base = if level >= 3 {
        1.2f64.powi(level as i32 - 2).floor() as usize
    } else {
        1
    };
    base.max(1).min(width.saturating_sub(1))
}

/// Random distinct columns, count scaled by level.
pub fn generate_pattern<R: Rng + ?Sized>(width: usize, level: u32, rng: &mut R) -> Vec<bool> {
    let count = obstacle_columns_for_level(level, width);
    let mut cols: Vec<usize> = (0..width).collect();
    cols.shuffle(rng);
    let mut pattern = vec![false; width];
    for &c in cols.iter().take(count) {
        pattern[c] = true;
    }
    pattern
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleScheduler {
    phase: ObstaclePhase,
    pieces_since_obstacle: u32,
    enabled: bool,
    base_interval: u32,
    base_level: u8,
    base_score_multiplier: u64,
    upgrade_level: u32,
    #[serde(with = "crate::serde_duration")]
    telegraph_delay: Duration,
    warning_tone: bool,
}

impl ObstacleScheduler {
    pub fn new(settings: &ObstacleSettings, telegraph_delay: Duration, warning_tone: bool) -> Self {
        Self {
            phase: ObstaclePhase::Idle,
            pieces_since_obstacle: 0,
            enabled: settings.enabled,
            base_interval: settings.piece_interval.max(1),
            base_level: settings.base_level,
            base_score_multiplier: settings.score_multiplier,
            upgrade_level: 0,
            telegraph_delay,
            warning_tone,
        }
    }

    pub fn phase(&self) -> &ObstaclePhase {
        &self.phase
    }

    pub fn is_telegraphed(&self) -> bool {
        matches!(self.phase, ObstaclePhase::Telegraphed(_))
    }

    /// The row that lands when the telegraph runs out.
    pub fn incoming(&self) -> Option<&ObstacleRow> {
        match &self.phase {
            ObstaclePhase::Telegraphed(countdown) => Some(countdown.payload()),
            _ => None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn upgrade_level(&self) -> u32 {
        self.upgrade_level
    }

    pub fn pieces_since_obstacle(&self) -> u32 {
        self.pieces_since_obstacle
    }

    /// Locked pieces between telegraphs.
    pub fn interval(&self) -> u32 {
        self.base_interval.saturating_sub(self.upgrade_level).max(1)
    }

    /// Toughness of injected cells.
    pub fn obstacle_level(&self) -> u8 {
        let level = self.base_level as u32 + self.upgrade_level;
        level.min(u8::MAX as u32) as u8
    }

    /// Score factor for clears that removed an obstacle row.
    pub fn score_multiplier(&self) -> u64 {
        self.base_score_multiplier + self.upgrade_level as u64
    }

    pub fn raise_upgrade_level(&mut self) {
        self.upgrade_level += 1;
        self.enabled = true;
    }

    /// Counts a locked piece. Once the interval is reached, rolls a row for a `width`-wide board
    /// at run level `level` and telegraphs it.
    pub fn on_piece_locked<R: Rng + ?Sized>(
        &mut self,
        width: usize,
        level: u32,
        rng: &mut R,
    ) -> Option<Signal> {
        if !self.enabled {
            return None;
        }
        self.pieces_since_obstacle += 1;
        if self.pieces_since_obstacle < self.interval() {
            return None;
        }
        self.pieces_since_obstacle = 0;
        let row = ObstacleRow {
            pattern: generate_pattern(width, level, rng),
            level: self.obstacle_level().max(MIN_INJECTED_OBSTACLE_LEVEL),
        };
        log::debug!("obstacle row telegraphed at columns {:?}", row.columns());
        self.phase = ObstaclePhase::Telegraphed(Countdown::new(self.telegraph_delay, row));
        Some(Signal::ObstacleWarning {
            message: OBSTACLE_WARNING_MESSAGE.to_string(),
            tone: self.warning_tone.then(ToneCue::obstacle_warning),
        })
    }

    /// Advances a pending telegraph; on expiry while playing, injects its row into `board`.
    pub fn advance(&mut self, dt: Duration, playing: bool, board: &mut Board) -> Option<Signal> {
        let phase = std::mem::replace(&mut self.phase, ObstaclePhase::Idle);
        let ObstaclePhase::Telegraphed(countdown) = phase else {
            self.phase = phase;
            return None;
        };
        if !playing {
            log::debug!("obstacle telegraph dropped outside play");
            return Some(Signal::ObstacleWarningCleared);
        }
        match countdown.advance(dt) {
            Tick::Pending(countdown) => {
                self.phase = ObstaclePhase::Telegraphed(countdown);
                None
            }
            Tick::Fired(row) => {
                board.add_obstacle_row_pattern(&row.pattern, row.level);
                self.phase = ObstaclePhase::Injected;
                let columns = row.columns();
                log::debug!("obstacle row injected at columns {columns:?}");
                Some(Signal::ObstacleInjected {
                    columns,
                    level: row.level,
                })
            }
        }
    }

    /// `Injected -> Idle`.
    pub fn settle(&mut self) -> Option<Signal> {
        if self.phase != ObstaclePhase::Injected {
            return None;
        }
        self.phase = ObstaclePhase::Idle;
        Some(Signal::ObstacleWarningCleared)
    }

    /// Drops a pending telegraph without effect.
    pub fn cancel(&mut self) -> Option<Signal> {
        match self.phase {
            ObstaclePhase::Idle => None,
            ObstaclePhase::Telegraphed(_) | ObstaclePhase::Injected => {
                self.phase = ObstaclePhase::Idle;
                log::debug!("obstacle telegraph cancelled");
                Some(Signal::ObstacleWarningCleared)
            }
        }
    }

    pub fn reset(&mut self, enabled: bool) {
        self.phase = ObstaclePhase::Idle;
        self.pieces_since_obstacle = 0;
        self.upgrade_level = 0;
        self.enabled = enabled;
    }
}
