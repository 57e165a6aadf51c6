use engine::GameLogic;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::collision::{RotationDir, drop_distance, try_move, try_rotate};
use crate::config::GameConfig;
use crate::game::{Command, Game};
use crate::phase::GamePhase;
use crate::progression::OfferOption;
use crate::shapes::PieceKind;

/// One recorded frame: a command, or a tick of `ms` simulation milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayInput {
    Command(Command),
    Tick(u64),
}

/// Deterministic run for the engine's runner and regression harness.
#[derive(Debug, Clone)]
pub struct RunLogic {
    config: GameConfig,
    pool: Vec<PieceKind>,
    seed: u64,
}

impl RunLogic {
    pub fn new(config: GameConfig, pool: Vec<PieceKind>, seed: u64) -> Self {
        Self { config, pool, seed }
    }

    pub fn standard(seed: u64) -> Self {
        Self::new(GameConfig::default(), PieceKind::starter_pool(), seed)
    }
}

impl GameLogic for RunLogic {
    type State = Game;
    type Input = PlayInput;

    fn initial_state(&self) -> Self::State {
        let mut game = Game::new(self.config.clone(), self.pool.clone(), self.seed);
        game.apply(Command::Start);
        game
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        match input {
            PlayInput::Command(command) => {
                next.apply(command);
            }
            PlayInput::Tick(ms) => next.tick(std::time::Duration::from_millis(ms)),
        }
        // Signals are for live hosts; recorded states stay lean.
        next.drain_signals();
        next
    }
}

/// Greedy placement bot used by the headless simulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autopilot;

impl Autopilot {
    /// Commands to send next for the current phase. Empty when the run is over.
    pub fn plan(&self, game: &Game) -> Vec<Command> {
        match game.phase() {
            GamePhase::Playing => self.plan_placement(game),
            GamePhase::Choosing => {
                let choice = game.progression().offer().and_then(|offer| {
                    offer.options.iter().find_map(|option| match *option {
                        OfferOption::Piece(kind) if !offer.piece_taken => {
                            Some(Command::SelectPiece(kind))
                        }
                        OfferOption::Upgrade(id) if !offer.upgrade_taken => {
                            Some(Command::SelectUpgrade(id))
                        }
                        _ => None,
                    })
                });
                vec![choice.unwrap_or(Command::Skip)]
            }
            GamePhase::RemovingPiece => vec![Command::Skip],
            GamePhase::KeepingPiece => {
                let snapshot = game.snapshot();
                match snapshot.keep_candidates.first() {
                    Some(&kind) => vec![Command::KeepPiece(kind)],
                    None => vec![Command::Skip],
                }
            }
            GamePhase::Paused => vec![Command::Resume],
            GamePhase::Ready | GamePhase::GameOver => Vec::new(),
        }
    }

    fn plan_placement(&self, game: &Game) -> Vec<Command> {
        let Some(&start) = game.active() else {
            return Vec::new();
        };
        let board = game.board();
        let mut best: Option<(f64, Vec<Command>)> = None;

        for turns in 0..4 {
            let mut piece = start;
            let mut commands = Vec::new();
            let mut ok = true;
            for _ in 0..turns {
                if try_rotate(board, &mut piece, RotationDir::Cw).is_none() {
                    ok = false;
                    break;
                }
                commands.push(Command::RotateCw);
            }
            if !ok {
                continue;
            }

            for dir in [-1, 1] {
                let mut shifted = piece;
                let mut moves = commands.clone();
                loop {
                    let mut landed = shifted;
                    landed.y += drop_distance(board, &landed);
                    let mut after = board.clone();
                    after.merge_piece(&landed);
                    let lines = after.clear_lines().removed();
                    let score = evaluate(&after, lines);
                    if best.as_ref().is_none_or(|(b, _)| score > *b) {
                        let mut plan = moves.clone();
                        plan.push(Command::HardDrop);
                        best = Some((score, plan));
                    }
                    if !try_move(board, &mut shifted, dir, 0) {
                        break;
                    }
                    moves.push(if dir < 0 {
                        Command::MoveLeft
                    } else {
                        Command::MoveRight
                    });
                }
            }
        }

        best.map(|(_, plan)| plan)
            .unwrap_or_else(|| vec![Command::HardDrop])
    }
}

/// Classic weighted surface heuristic; higher is better.
fn evaluate(board: &Board, lines: usize) -> f64 {
    let width = board.width();
    let height = board.height();
    let mut heights = vec![0usize; width];
    let mut holes = 0usize;
    for (c, column_height) in heights.iter_mut().enumerate() {
        let mut seen_top = false;
        for r in 0..height {
            let filled = !board.rows()[r][c].is_empty();
            if filled && !seen_top {
                seen_top = true;
                *column_height = height - r;
            } else if !filled && seen_top {
                holes += 1;
            }
        }
    }
    let aggregate: usize = heights.iter().sum();
    let bumpiness: usize = heights.windows(2).map(|w| w[0].abs_diff(w[1])).sum();
    let max_height = heights.iter().copied().max().unwrap_or(0);

    0.76 * lines as f64
        - 0.51 * aggregate as f64
        - 0.36 * holes as f64
        - 0.18 * bumpiness as f64
        - 0.25 * max_height as f64
}
