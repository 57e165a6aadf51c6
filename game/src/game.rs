//! One run of the simulation: board, active piece, timers and the progression economy.
//!
//! All mutation goes through [`Game::apply`] (discrete commands) and [`Game::tick`]
//! (elapsed simulation time). Both are deterministic for a given seed, so a `Game` can be
//! cloned, serialized and replayed frame by frame.

use std::time::Duration;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell};
use crate::collision::{RotationDir, collides, drop_distance, is_resting, try_move, try_rotate};
use crate::config::GameConfig;
use crate::hold::{HeldPiece, HoldCells};
use crate::objectives::{Objectives, Scoreboard};
use crate::obstacles::ObstacleScheduler;
use crate::phase::{GamePhase, PhaseEffect, PhaseEvent};
use crate::piece::Piece;
use crate::progression::{Progression, UnlockOffer};
use crate::randomizer::Randomizer;
use crate::shapes::PieceKind;
use crate::signals::Signal;
use crate::upgrades::{Consumable, ConsumableCharges, UpgradeId, UpgradeOutcome};

/// Stream offset so board effects do not share a sequence with piece draws.
const EFFECT_RNG_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDropOn,
    SoftDropOff,
    HardDrop,
    Hold,
    Release,
    UseConsumable(Consumable),
    SelectPiece(PieceKind),
    SelectUpgrade(UpgradeId),
    SelectRemoval(PieceKind),
    KeepPiece(PieceKind),
    Reroll,
    Skip,
    Start,
    Pause,
    Resume,
}

/// Turns host timestamps into simulation deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    last: Option<Duration>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the previous frame; zero on the first frame after a reset.
    pub fn frame(&mut self, now: Duration) -> Duration {
        let dt = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last = Some(now);
        dt
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveView {
    pub kind: PieceKind,
    pub rotation: u8,
    pub cells: Vec<(i32, i32)>,
    /// Rows the piece would fall on a hard drop.
    pub drop_distance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpgradeIndicators {
    pub speed_up: f32,
    pub reroll_charges: u32,
    pub second_chance: bool,
    pub score_multiplier: u64,
    pub score_multiplier_lines: i32,
    pub charges: ConsumableCharges,
    pub gravity_cost: u32,
    pub preview_bonus: u32,
    pub extra_hold_cells: u32,
    pub extra_columns: u32,
    pub obstacle_level: u8,
    pub obstacle_upgrade_level: u32,
}

/// Read-only view for renderers and tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Vec<Cell>>,
    pub active: Option<ActiveView>,
    pub held: Option<PieceKind>,
    pub hold_cells: Vec<HeldPiece>,
    pub hold_capacity: usize,
    pub hold_ready: bool,
    pub preview: Vec<PieceKind>,
    pub score: u64,
    pub lines: u32,
    pub level: u32,
    pub combo: i32,
    pub objectives: Objectives,
    pub indicators: UpgradeIndicators,
    pub obstacle_warning: bool,
    /// Columns of the telegraphed row, empty when nothing is pending.
    pub incoming_obstacle: Vec<usize>,
    pub offer: Option<UnlockOffer>,
    pub removal_candidates: Vec<PieceKind>,
    pub keep_candidates: Vec<PieceKind>,
    pub permanent_pool: Vec<PieceKind>,
    pub current_pool: Vec<PieceKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    config: GameConfig,
    phase: GamePhase,
    board: Board,
    active: Option<Piece>,
    hold: HoldCells,
    randomizer: Randomizer,
    rng: Xoshiro256StarStar,
    score: Scoreboard,
    progression: Progression,
    obstacles: ObstacleScheduler,
    #[serde(with = "crate::serde_duration")]
    fall_elapsed: Duration,
    #[serde(with = "crate::serde_duration")]
    lock_elapsed: Duration,
    soft_drop: bool,
    clock_reset: bool,
    signals: Vec<Signal>,
}

impl Game {
    pub fn new(config: GameConfig, permanent_pool: Vec<PieceKind>, seed: u64) -> Self {
        let config = config.sanitized();
        let obstacles = ObstacleScheduler::new(
            &config.obstacles,
            config.timing.telegraph_delay(),
            config.cues.warning_tone,
        );
        let progression = Progression::new(
            permanent_pool,
            config.economy,
            config.board.max_extra_columns,
        );
        Self {
            phase: GamePhase::Ready,
            board: Board::new(config.board.width, config.board.height),
            active: None,
            hold: HoldCells::new(),
            randomizer: Randomizer::new(seed),
            rng: Xoshiro256StarStar::seed_from_u64(seed ^ EFFECT_RNG_STREAM),
            score: Scoreboard::new(obstacles.enabled()),
            progression,
            obstacles,
            fall_elapsed: Duration::ZERO,
            lock_elapsed: Duration::ZERO,
            soft_drop: false,
            clock_reset: false,
            signals: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Direct board access for tooling and scripted setups.
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn active(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    /// Kind in the primary hold cell.
    pub fn held(&self) -> Option<PieceKind> {
        self.hold.primary()
    }

    pub fn hold_cells(&self) -> &HoldCells {
        &self.hold
    }

    /// One primary cell plus the timed cells bought this run.
    pub fn hold_capacity(&self) -> usize {
        let extra = self.progression.upgrades.perm.extra_hold_cells as usize;
        1 + extra.min(self.config.economy.extra_hold_turns.len())
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.score
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn obstacles(&self) -> &ObstacleScheduler {
        &self.obstacles
    }

    pub fn preview_depth(&self) -> usize {
        1 + self.progression.upgrades.perm.preview_bonus as usize
    }

    pub fn preview(&self) -> Vec<PieceKind> {
        self.randomizer.peek(self.preview_depth())
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// True once after each permanent-pool mutation; the host persists the pool.
    pub fn take_pool_dirty(&mut self) -> bool {
        self.progression.take_pool_dirty()
    }

    /// True once after a frozen phase resumes; the host restarts its frame clock.
    pub fn take_clock_reset(&mut self) -> bool {
        std::mem::take(&mut self.clock_reset)
    }

    /// Applies a command. Returns false when it was rejected in the current phase or had no
    /// effect.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.transition(PhaseEvent::Start),
            Command::Pause => self.transition(PhaseEvent::Pause),
            Command::Resume => self.transition(PhaseEvent::Resume),
            _ => match self.phase {
                GamePhase::Playing => self.apply_play(command),
                GamePhase::Choosing => self.apply_choice(command),
                GamePhase::RemovingPiece => self.apply_removal(command),
                GamePhase::KeepingPiece => self.apply_keep(command),
                GamePhase::Ready | GamePhase::Paused | GamePhase::GameOver => false,
            },
        }
    }

    fn apply_play(&mut self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.shift(-1),
            Command::MoveRight => self.shift(1),
            Command::RotateCw => self.rotate(RotationDir::Cw),
            Command::RotateCcw => self.rotate(RotationDir::Ccw),
            Command::SoftDropOn => {
                self.soft_drop = true;
                true
            }
            Command::SoftDropOff => {
                self.soft_drop = false;
                true
            }
            Command::HardDrop => self.hard_drop(),
            Command::Hold => self.hold(),
            Command::Release => self.release(),
            Command::UseConsumable(consumable) => self.use_consumable(consumable),
            _ => false,
        }
    }

    fn apply_choice(&mut self, command: Command) -> bool {
        match command {
            Command::SelectPiece(kind) => {
                if !self.progression.select_piece(kind) {
                    return false;
                }
                self.signals.push(Signal::PieceUnlocked(kind));
                self.finish_choice_if_resolved();
                true
            }
            Command::SelectUpgrade(id) => self.select_upgrade(id),
            Command::Reroll => self.progression.reroll(&mut self.rng),
            Command::Skip => {
                self.progression.close_offer();
                self.transition(PhaseEvent::ChoiceDone)
            }
            _ => false,
        }
    }

    fn apply_removal(&mut self, command: Command) -> bool {
        match command {
            Command::SelectRemoval(kind) => {
                if !self.progression.remove_from_run(kind) {
                    return false;
                }
                self.randomizer.retain_pool(self.progression.current_pool());
                self.refill_preview();
                self.signals.push(Signal::PieceRemoved(kind));
                self.transition(PhaseEvent::RemovalDone)
            }
            Command::Skip => self.transition(PhaseEvent::RemovalDone),
            _ => false,
        }
    }

    fn apply_keep(&mut self, command: Command) -> bool {
        match command {
            Command::KeepPiece(kind) => {
                if !self.progression.keep_permanently(kind) {
                    return false;
                }
                // Dirty flag stays set for the host; the signal is advisory.
                self.signals.push(Signal::PermanentPoolChanged);
                self.transition(PhaseEvent::KeepDone)
            }
            Command::Skip => self.transition(PhaseEvent::KeepDone),
            _ => false,
        }
    }

    /// Replaces the permanent pool with random kinds. Only outside a run.
    pub fn reset_permanent_pool(&mut self) -> bool {
        if !matches!(self.phase, GamePhase::Ready | GamePhase::GameOver) {
            return false;
        }
        self.progression.reset_permanent_pool(&mut self.rng);
        self.signals.push(Signal::PermanentPoolChanged);
        true
    }

    /// Only outside a run, and never below the minimum pool size.
    pub fn remove_permanent_piece(&mut self, kind: PieceKind) -> bool {
        if !matches!(self.phase, GamePhase::Ready | GamePhase::GameOver) {
            return false;
        }
        if !self.progression.remove_permanent_piece(kind) {
            return false;
        }
        self.signals.push(Signal::PermanentPoolChanged);
        true
    }

    /// Advances timers by `dt` of simulation time. Frozen outside `Playing`.
    pub fn tick(&mut self, dt: Duration) {
        if !self.phase.is_playing() {
            return;
        }

        self.hold.tick(dt);

        if let Some(signal) = self.obstacles.advance(dt, true, &mut self.board) {
            self.signals.push(signal);
            if let Some(cleared) = self.obstacles.settle() {
                self.unstick_active();
                self.signals.push(cleared);
            }
        }

        self.step_gravity(dt);
    }

    /// Convenience for hosts driving the game from wall-clock timestamps.
    pub fn advance_frame(&mut self, clock: &mut FrameClock, now: Duration) {
        if self.take_clock_reset() {
            clock.reset();
        }
        let dt = clock.frame(now);
        self.tick(dt);
    }

    pub fn snapshot(&self) -> Snapshot {
        let upgrades = &self.progression.upgrades;
        Snapshot {
            phase: self.phase,
            width: self.board.width(),
            height: self.board.height(),
            cells: self.board.rows().to_vec(),
            active: self.active.map(|piece| ActiveView {
                kind: piece.kind,
                rotation: piece.rotation,
                cells: piece.cells(),
                drop_distance: drop_distance(&self.board, &piece),
            }),
            held: self.hold.primary(),
            hold_cells: self.hold.cells().to_vec(),
            hold_capacity: self.hold_capacity(),
            hold_ready: self.hold.can_hold(self.hold_capacity()),
            preview: self.preview(),
            score: self.score.score,
            lines: self.score.lines,
            level: self.score.level,
            combo: self.score.combo,
            objectives: self.score.objectives,
            indicators: UpgradeIndicators {
                speed_up: upgrades.temp.speed_up,
                reroll_charges: upgrades.temp.reroll_charges,
                second_chance: upgrades.temp.second_chance,
                score_multiplier: upgrades.score_factor(),
                score_multiplier_lines: upgrades.temp.score_multiplier_lines,
                charges: upgrades.temp.charges,
                gravity_cost: self.progression.consumable_cost(Consumable::Gravity),
                preview_bonus: upgrades.perm.preview_bonus,
                extra_hold_cells: upgrades.perm.extra_hold_cells,
                extra_columns: upgrades.perm.extra_columns,
                obstacle_level: self.obstacles.obstacle_level(),
                obstacle_upgrade_level: self.obstacles.upgrade_level(),
            },
            obstacle_warning: self.obstacles.is_telegraphed(),
            incoming_obstacle: self
                .obstacles
                .incoming()
                .map(|row| row.columns())
                .unwrap_or_default(),
            offer: self.progression.offer().cloned(),
            removal_candidates: if self.phase == GamePhase::RemovingPiece {
                self.progression.removal_candidates()
            } else {
                Vec::new()
            },
            keep_candidates: if self.phase == GamePhase::KeepingPiece {
                self.progression.keep_candidates()
            } else {
                Vec::new()
            },
            permanent_pool: self.progression.permanent_pool().to_vec(),
            current_pool: self.progression.current_pool().to_vec(),
        }
    }

    fn transition(&mut self, event: PhaseEvent) -> bool {
        let (next, effect) = self.phase.handle(event);
        if next == self.phase && effect == PhaseEffect::None {
            return false;
        }
        log::debug!("phase {:?} -> {next:?} on {event:?}", self.phase);
        self.phase = next;
        match effect {
            PhaseEffect::None => {}
            PhaseEffect::ResetRun => self.reset_run(),
            PhaseEffect::CancelTelegraph => self.cancel_telegraph(),
            PhaseEffect::ResumeClock => {
                self.clock_reset = true;
                self.fall_elapsed = Duration::ZERO;
            }
            PhaseEffect::FinalizeGameOver => self.finalize_game_over(),
        }
        true
    }

    fn cancel_telegraph(&mut self) {
        if let Some(signal) = self.obstacles.cancel() {
            self.signals.push(signal);
        }
    }

    fn reset_run(&mut self) {
        self.cancel_telegraph();
        self.progression.start_run();
        self.board = Board::new(self.config.board.width, self.config.board.height);
        self.obstacles.reset(self.config.obstacles.enabled);
        self.score = Scoreboard::new(self.obstacles.enabled());
        self.randomizer.clear();
        self.active = None;
        self.hold.clear();
        self.soft_drop = false;
        self.clock_reset = true;
        log::info!(
            "run started with pool {:?}",
            self.progression
                .current_pool()
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
        );
        if !self.spawn_next() {
            self.top_out();
        }
    }

    fn finalize_game_over(&mut self) {
        self.cancel_telegraph();
        self.active = None;
        self.soft_drop = false;
        log::info!(
            "game over: score {} level {} lines {}",
            self.score.score,
            self.score.level,
            self.score.lines
        );
        self.signals.push(Signal::GameOver {
            score: self.score.score,
            level: self.score.level,
        });
    }

    fn top_out(&mut self) {
        let keep_choice = !self.progression.keep_candidates().is_empty();
        self.transition(PhaseEvent::ToppedOut { keep_choice });
    }

    fn refill_preview(&mut self) {
        let depth = self.preview_depth();
        self.randomizer
            .ensure(self.progression.current_pool(), depth);
    }

    /// Spawns the next queued kind. False on spawn collision or an empty pool.
    fn spawn_next(&mut self) -> bool {
        let Some(kind) = self.randomizer.next(self.progression.current_pool()) else {
            return false;
        };
        self.refill_preview();
        self.place_spawn(kind)
    }

    fn place_spawn(&mut self, kind: PieceKind) -> bool {
        let piece = Piece::spawn(kind, self.board.width());
        if collides(&self.board, &piece, 0, 0, piece.rotation) {
            log::debug!("spawn blocked for {kind}");
            self.active = None;
            return false;
        }
        self.active = Some(piece);
        self.fall_elapsed = Duration::ZERO;
        self.lock_elapsed = Duration::ZERO;
        true
    }

    /// Lifts the active piece until it no longer overlaps the board.
    fn unstick_active(&mut self) {
        let Some(piece) = self.active.as_mut() else {
            return;
        };
        while collides(&self.board, piece, 0, 0, piece.rotation) {
            piece.y -= 1;
        }
    }

    fn shift(&mut self, dx: i32) -> bool {
        let Some(piece) = self.active.as_mut() else {
            return false;
        };
        if !try_move(&self.board, piece, dx, 0) {
            return false;
        }
        if !is_resting(&self.board, piece) {
            self.lock_elapsed = Duration::ZERO;
        }
        true
    }

    fn rotate(&mut self, dir: RotationDir) -> bool {
        let Some(piece) = self.active.as_mut() else {
            return false;
        };
        if try_rotate(&self.board, piece, dir).is_none() {
            return false;
        }
        if !is_resting(&self.board, piece) {
            self.lock_elapsed = Duration::ZERO;
        }
        true
    }

    fn hard_drop(&mut self) -> bool {
        let Some(piece) = self.active.as_mut() else {
            return false;
        };
        let distance = drop_distance(&self.board, piece);
        piece.y += distance;
        self.score.add_drop_points(distance.max(0) as u32);
        self.lock_piece();
        true
    }

    fn hold(&mut self) -> bool {
        let Some(piece) = self.active else {
            return false;
        };
        let capacity = self.hold_capacity();
        if !self.hold.hold(
            piece.kind,
            capacity,
            &self.config.economy.extra_hold_turns,
            self.config.timing.hold_cooldown(),
        ) {
            return false;
        }
        self.active = None;
        if !self.spawn_next() {
            self.top_out();
        }
        true
    }

    /// Swaps the primary hold cell with the active piece. Shares the hold cooldown.
    fn release(&mut self) -> bool {
        let (Some(kind), Some(current)) = (self.hold.primary(), self.active) else {
            return false;
        };
        if !self.hold.is_open() {
            return false;
        }
        if !self.place_spawn(kind) {
            self.active = Some(current);
            return false;
        }
        self.hold
            .release(Some(current.kind), self.config.timing.hold_cooldown());
        true
    }

    fn use_consumable(&mut self, consumable: Consumable) -> bool {
        if self.board.occupied_count() == 0 || !self.progression.can_use(consumable) {
            return false;
        }
        let applied = match consumable {
            Consumable::Row => self.board.clear_random_row(&mut self.rng).is_some(),
            Consumable::Column => self.board.clear_random_column(&mut self.rng).is_some(),
            Consumable::Area => self.board.clear_random_area(&mut self.rng).is_some(),
            Consumable::Gravity => {
                self.board.apply_gravity();
                true
            }
        };
        if !applied {
            return false;
        }
        self.progression.spend(consumable);
        self.unstick_active();
        log::debug!("used {consumable:?}");
        true
    }

    fn select_upgrade(&mut self, id: UpgradeId) -> bool {
        let Some(outcome) = self.progression.select_upgrade(id, &mut self.rng) else {
            return false;
        };
        self.signals.push(Signal::UpgradeApplied(id));
        match outcome {
            UpgradeOutcome::BoardWidened { extra } => self.board.widen(extra as usize),
            UpgradeOutcome::ObstaclesRaised => self.obstacles.raise_upgrade_level(),
            UpgradeOutcome::PieceRemovalOpened => {
                if !self.progression.removal_candidates().is_empty() {
                    self.progression.close_offer();
                    return self.transition(PhaseEvent::OpenRemoval);
                }
            }
            UpgradeOutcome::Applied | UpgradeOutcome::AtCap => {}
        }
        self.refill_preview();
        self.finish_choice_if_resolved();
        true
    }

    fn finish_choice_if_resolved(&mut self) {
        if self.progression.offer_resolved() {
            self.progression.close_offer();
            self.transition(PhaseEvent::ChoiceDone);
        }
    }

    fn fall_interval(&self) -> Duration {
        if self.soft_drop {
            self.config.timing.soft_drop_interval()
        } else {
            self.config
                .timing
                .gravity_interval(self.score.level, self.progression.upgrades.temp.speed_up)
        }
    }

    fn step_gravity(&mut self, dt: Duration) {
        let interval = self.fall_interval();
        let Some(piece) = self.active.as_mut() else {
            return;
        };
        self.fall_elapsed += dt;
        while self.fall_elapsed >= interval {
            self.fall_elapsed -= interval;
            if !try_move(&self.board, piece, 0, 1) {
                self.fall_elapsed = Duration::ZERO;
                break;
            }
            self.lock_elapsed = Duration::ZERO;
        }

        if is_resting(&self.board, piece) {
            self.lock_elapsed += dt;
            if self.lock_elapsed >= self.config.timing.lock_delay() {
                self.lock_piece();
            }
        } else {
            self.lock_elapsed = Duration::ZERO;
        }
    }

    /// Merge, clear, score, survival check, obstacle cadence, next spawn, level-up.
    fn lock_piece(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };
        self.board.merge_piece(&piece);
        let returned = self.hold.on_piece_locked();
        if !returned.is_empty() {
            self.randomizer.return_to_front(&returned);
            log::debug!("hold cells expired: {returned:?}");
            self.signals.push(Signal::HeldPiecesReturned(returned));
        }
        let clear = self.board.clear_lines();
        let lock = self.score.record_lock(
            &clear,
            self.obstacles.score_multiplier(),
            self.progression.upgrades.score_factor(),
        );

        let removed = clear.removed();
        if removed > 0 {
            self.progression.upgrades.consume_score_lines(removed);
            self.progression.earn_gravity_charges(removed);
            self.signals.push(Signal::LinesCleared {
                count: removed,
                with_obstacle: clear.any_obstacle(),
                points: lock.points,
            });
        }
        if !clear.degraded_rows.is_empty() {
            self.signals.push(Signal::ObstacleRowsWeakened {
                count: clear.degraded_rows.len(),
            });
        }

        if self.board.top_row_occupied() {
            if self.progression.upgrades.take_second_chance() {
                self.board
                    .clear_top_rows(self.config.economy.second_chance_rows);
                self.signals.push(Signal::SecondChanceUsed);
                log::info!("second chance used");
            } else {
                self.top_out();
                return;
            }
        }

        if let Some(signal) =
            self.obstacles
                .on_piece_locked(self.board.width(), self.score.level, &mut self.rng)
        {
            self.signals.push(signal);
        }

        if !self.spawn_next() {
            self.top_out();
            return;
        }

        if lock.leveled_up {
            let level = self.score.level_up(self.obstacles.enabled());
            log::info!("level up: {level}");
            self.signals.push(Signal::LevelUp { level });
            if self.progression.generate_offer(&mut self.rng) {
                self.transition(PhaseEvent::LevelUp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::OfferOption;

    fn kind(name: &str) -> PieceKind {
        PieceKind::from_name(name).unwrap()
    }

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.obstacles.enabled = false;
        config
    }

    fn started(pool: &[&str]) -> Game {
        let mut game = Game::new(quiet_config(), pool.iter().map(|n| kind(n)).collect(), 7);
        assert!(game.apply(Command::Start));
        game
    }

    #[test]
    fn commands_are_ignored_until_the_run_starts() {
        let mut game = Game::new(quiet_config(), PieceKind::starter_pool(), 1);
        assert!(!game.apply(Command::MoveLeft));
        assert!(!game.apply(Command::HardDrop));
        assert!(game.active().is_none());
        game.tick(Duration::from_secs(5));
        assert_eq!(game.phase(), GamePhase::Ready);

        assert!(game.apply(Command::Start));
        assert_eq!(game.phase(), GamePhase::Playing);
        assert!(game.active().is_some());
        assert_eq!(game.preview().len(), 1);
    }

    #[test]
    fn hard_drop_scores_distance_and_locks() {
        let mut game = started(&["I"]);
        assert!(game.apply(Command::HardDrop));
        assert_eq!(game.scoreboard().score, 2 * 21);
        assert_eq!(game.board().occupied_count(), 4);
        assert_eq!(game.active().map(|p| p.y), Some(-2));
    }

    #[test]
    fn resting_piece_locks_after_the_delay() {
        let mut game = started(&["I"]);
        game.apply(Command::SoftDropOn);
        for _ in 0..21 {
            game.tick(Duration::from_millis(40));
        }
        assert_eq!(game.active().map(|p| p.y), Some(19));
        game.tick(Duration::from_millis(400));
        assert_eq!(game.board().occupied_count(), 0);
        game.tick(Duration::from_millis(60));
        assert_eq!(game.board().occupied_count(), 4);
    }

    #[test]
    fn hold_then_release_swaps_through_the_slot() {
        let mut game = started(&["I", "O"]);
        let first = game.active().unwrap().kind;
        assert!(game.apply(Command::Hold));
        assert_eq!(game.held(), Some(first));
        game.tick(Duration::from_millis(500));
        assert!(!game.apply(Command::Hold));

        let second = game.active().unwrap().kind;
        assert!(game.apply(Command::Release));
        assert_eq!(game.active().unwrap().kind, first);
        assert_eq!(game.held(), Some(second));
    }

    #[test]
    fn release_waits_out_the_shared_cooldown() {
        let mut game = started(&["I"]);
        assert!(game.apply(Command::Hold));
        assert!(!game.snapshot().hold_ready);
        assert!(!game.apply(Command::Release));
        game.tick(Duration::from_millis(499));
        assert!(!game.apply(Command::Release));
        game.tick(Duration::from_millis(1));
        assert!(game.apply(Command::Release));
        // Release closes the gate again.
        assert!(!game.apply(Command::Release));
        game.tick(Duration::from_millis(500));
        assert!(game.apply(Command::Release));
    }

    #[test]
    fn timed_hold_cell_returns_its_piece_to_the_queue() {
        let mut game = started(&["I", "O"]);
        game.progression.upgrades.perm.extra_hold_cells = 1;
        assert_eq!(game.hold_capacity(), 2);

        assert!(game.apply(Command::Hold));
        game.tick(Duration::from_millis(500));
        let timed = game.active().unwrap().kind;
        assert!(game.apply(Command::Hold));
        game.tick(Duration::from_millis(500));
        assert!(!game.apply(Command::Hold));
        assert_eq!(game.snapshot().hold_cells[1].turns_left, Some(3));

        game.apply(Command::HardDrop);
        game.apply(Command::HardDrop);
        game.drain_signals();
        game.apply(Command::HardDrop);
        assert!(
            game.drain_signals()
                .contains(&Signal::HeldPiecesReturned(vec![timed]))
        );
        assert_eq!(game.hold_cells().cells().len(), 1);
        assert_eq!(game.active().unwrap().kind, timed);
    }

    #[test]
    fn level_up_lock_still_counts_toward_the_obstacle_interval() {
        let mut config = GameConfig::default();
        config.board.width = 4;
        let mut game = Game::new(config, vec![kind("I")], 5);
        game.apply(Command::Start);
        game.score.objectives = Objectives {
            target_lines: 1,
            ..Objectives::default()
        };

        assert!(game.apply(Command::HardDrop));
        assert_eq!(game.scoreboard().level, 2);
        assert_eq!(game.obstacles().pieces_since_obstacle(), 1);
    }

    #[test]
    fn save_after_real_timestamps_resumes_identically() {
        let mut live = started(&["T", "L", "O"]);
        live.take_clock_reset();
        let mut clock = FrameClock::new();
        for frame in 0..40u64 {
            live.advance_frame(&mut clock, Duration::from_micros(frame * 16_667));
        }

        let json = serde_json::to_string(&live).unwrap();
        let mut loaded: Game = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.fall_elapsed, live.fall_elapsed);
        assert_eq!(loaded.lock_elapsed, live.lock_elapsed);

        let mut loaded_clock = clock;
        for frame in 40..400u64 {
            let now = Duration::from_micros(frame * 16_667);
            live.advance_frame(&mut clock, now);
            loaded.advance_frame(&mut loaded_clock, now);
        }
        assert_eq!(loaded.snapshot(), live.snapshot());
    }

    #[test]
    fn topping_out_without_unlocks_ends_the_run() {
        let mut game = started(&["O"]);
        game.board_mut().set(0, 0, Cell::Occupied(kind("O")));
        game.apply(Command::HardDrop);
        assert_eq!(game.phase(), GamePhase::GameOver);
        assert!(game.active().is_none());
        let signals = game.drain_signals();
        assert!(signals.iter().any(|s| matches!(s, Signal::GameOver { .. })));
        assert!(!game.apply(Command::MoveLeft));
    }

    #[test]
    fn second_chance_clears_the_top_rows_once() {
        let mut game = started(&["O"]);
        game.progression.upgrades.temp.second_chance = true;
        game.board_mut().set(0, 0, Cell::Occupied(kind("O")));
        game.board_mut().set(2, 0, Cell::Occupied(kind("O")));
        game.apply(Command::HardDrop);
        assert_eq!(game.phase(), GamePhase::Playing);
        assert!(game.board().is_empty_at(0, 0));
        assert!(game.board().is_empty_at(2, 0));
        assert!(game.drain_signals().contains(&Signal::SecondChanceUsed));
        assert!(!game.progression().upgrades.temp.second_chance);
    }

    #[test]
    fn keep_choice_precedes_game_over_when_something_was_unlocked() {
        let mut game = started(&["O", "I", "T", "L"]);
        let unlocked = loop {
            game.progression.generate_offer(&mut game.rng);
            let piece = game.progression.offer().unwrap().options.iter().find_map(|o| match o {
                OfferOption::Piece(k) => Some(*k),
                OfferOption::Upgrade(_) => None,
            });
            if let Some(k) = piece {
                assert!(game.progression.select_piece(k));
                break k;
            }
        };
        game.progression.close_offer();

        game.board_mut().set(0, 0, Cell::Occupied(kind("O")));
        game.apply(Command::HardDrop);
        assert_eq!(game.phase(), GamePhase::KeepingPiece);
        assert_eq!(game.snapshot().keep_candidates, vec![unlocked]);

        assert!(!game.apply(Command::KeepPiece(kind("O"))));
        assert!(game.apply(Command::KeepPiece(unlocked)));
        assert_eq!(game.phase(), GamePhase::GameOver);
        assert!(game.progression().permanent_pool().contains(&unlocked));
        assert!(game.take_pool_dirty());
    }

    #[test]
    fn pause_freezes_and_cancels_a_pending_obstacle() {
        let mut game = Game::new(GameConfig::default(), vec![kind("I")], 3);
        game.apply(Command::Start);
        for _ in 0..4 {
            game.apply(Command::HardDrop);
        }
        assert!(game.obstacles().is_telegraphed());
        assert!(game.apply(Command::Pause));
        assert!(!game.obstacles().is_telegraphed());
        assert!(game.drain_signals().contains(&Signal::ObstacleWarningCleared));

        let before = game.board().clone();
        game.tick(Duration::from_secs(10));
        assert_eq!(game.board(), &before);
        assert!(game.apply(Command::Resume));
        assert!(game.take_clock_reset());
        game.tick(Duration::from_millis(700));
        assert_eq!(game.board().rows()[19], before.rows()[19]);
    }

    #[test]
    fn telegraphed_row_lands_while_playing() {
        let mut game = Game::new(GameConfig::default(), vec![kind("I")], 3);
        game.apply(Command::Start);
        for _ in 0..4 {
            game.apply(Command::HardDrop);
        }
        game.drain_signals();
        game.tick(Duration::from_millis(600));
        let signals = game.drain_signals();
        assert!(signals.iter().any(|s| matches!(s, Signal::ObstacleInjected { .. })));
        assert!(signals.contains(&Signal::ObstacleWarningCleared));
        assert!(game.board().rows()[19].iter().any(|c| c.is_obstacle()));
    }

    #[test]
    fn consumables_need_charges_and_an_occupied_board() {
        let mut game = started(&["I"]);
        game.progression.upgrades.temp.charges.add(Consumable::Row, 1);
        assert!(!game.apply(Command::UseConsumable(Consumable::Row)));
        game.apply(Command::HardDrop);
        assert!(game.apply(Command::UseConsumable(Consumable::Row)));
        assert_eq!(game.board().occupied_count(), 0);
        assert!(!game.apply(Command::UseConsumable(Consumable::Row)));
    }

    #[test]
    fn frame_clock_resets_after_resume() {
        let mut game = started(&["I"]);
        let mut clock = FrameClock::new();
        game.take_clock_reset();
        game.advance_frame(&mut clock, Duration::from_millis(0));
        game.advance_frame(&mut clock, Duration::from_millis(16));
        game.apply(Command::Pause);
        game.apply(Command::Resume);
        game.advance_frame(&mut clock, Duration::from_secs(60));
        // A one-minute jump after resuming would have dropped and locked the piece.
        assert_eq!(game.board().occupied_count(), 0);
    }
}
