use serde::{Deserialize, Serialize};

use crate::board::LineClear;

/// Per-level targets. A target of 0 disables that objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objectives {
    pub target_lines: u32,
    pub target_score: u64,
    pub target_obstacles: u32,
    pub progress_lines: u32,
    pub progress_score: u64,
    pub progress_obstacles: u32,
}

impl Objectives {
    pub fn for_level(level: u32, obstacle_mode: bool) -> Self {
        let level = level.max(1);
        Self {
            target_lines: 6 + (level - 1) * 2,
            target_score: 800 * level as u64,
            target_obstacles: if obstacle_mode { (4 + level).min(12) } else { 0 },
            ..Self::default()
        }
    }

    /// Adds progress, clamped at each target.
    pub fn record(&mut self, lines: u32, score: u64, obstacle_lines: u32) {
        self.progress_lines = (self.progress_lines + lines).min(self.target_lines);
        self.progress_score = (self.progress_score + score).min(self.target_score);
        self.progress_obstacles = (self.progress_obstacles + obstacle_lines).min(self.target_obstacles);
    }

    /// True when every enabled target is met and at least one is enabled.
    pub fn is_complete(&self) -> bool {
        let mut any = false;
        let mut done = true;
        if self.target_lines > 0 {
            any = true;
            done &= self.progress_lines >= self.target_lines;
        }
        if self.target_score > 0 {
            any = true;
            done &= self.progress_score >= self.target_score;
        }
        if self.target_obstacles > 0 {
            any = true;
            done &= self.progress_obstacles >= self.target_obstacles;
        }
        any && done
    }
}

/// Base points for removing `lines` rows at once, before the level factor.
pub fn line_clear_points(lines: usize) -> u64 {
    const TABLE: [u64; 5] = [0, 100, 300, 500, 800];
    let fours = (lines / 4) as u64;
    let rest = lines % 4;
    fours * TABLE[4] + TABLE[rest]
}

pub const HARD_DROP_POINTS_PER_ROW: u64 = 2;
pub const COMBO_BONUS_PER_STEP: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockScore {
    pub points: u64,
    pub combo_bonus: u64,
    pub leveled_up: bool,
}

/// Running totals for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub score: u64,
    pub lines: u32,
    pub level: u32,
    /// -1 until the first clearing lock.
    pub combo: i32,
    pub objectives: Objectives,
}

impl Scoreboard {
    pub fn new(obstacle_mode: bool) -> Self {
        Self {
            score: 0,
            lines: 0,
            level: 1,
            combo: -1,
            objectives: Objectives::for_level(1, obstacle_mode),
        }
    }

    pub fn add_drop_points(&mut self, rows: u32) {
        self.score += rows as u64 * HARD_DROP_POINTS_PER_ROW;
    }

    /// Scores one lock. Only removed rows count; rows that merely lost an obstacle level do
    /// not. `score_factor` is the temporary multiplier.
    pub fn record_lock(
        &mut self,
        clear: &LineClear,
        obstacle_multiplier: u64,
        score_factor: u64,
    ) -> LockScore {
        let removed = clear.removed();
        if removed == 0 {
            self.combo = -1;
            return LockScore {
                points: 0,
                combo_bonus: 0,
                leveled_up: false,
            };
        }

        let level = self.level as u64;
        let mut base = line_clear_points(removed) * level;
        if clear.any_obstacle() {
            base *= obstacle_multiplier.max(1);
        }
        self.combo += 1;
        let combo_bonus = if self.combo > 0 {
            COMBO_BONUS_PER_STEP * self.combo as u64 * level
        } else {
            0
        };
        let points = (base + combo_bonus) * score_factor.max(1);

        self.score += points;
        self.lines += removed as u32;
        self.objectives
            .record(removed as u32, points, clear.obstacle_rows_removed() as u32);

        LockScore {
            points,
            combo_bonus,
            leveled_up: self.objectives.is_complete(),
        }
    }

    /// Next level with fresh targets.
    pub fn level_up(&mut self, obstacle_mode: bool) -> u32 {
        self.level += 1;
        self.objectives = Objectives::for_level(self.level, obstacle_mode);
        self.level
    }
}
