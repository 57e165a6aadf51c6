use std::time::Duration;

use crate::config::GameConfig;
use crate::game::{Command, FrameClock, Game};
use crate::pool_store::{PoolStore, load_pool, save_pool};
use crate::shapes::PieceKind;
use crate::signals::Signal;

/// A game bound to the store that holds its permanent pool.
///
/// The pool is read once when the session opens and written back after every command that
/// changed it. Write failures are logged and retried on the next change.
#[derive(Debug)]
pub struct Session<S: PoolStore> {
    game: Game,
    store: S,
}

impl<S: PoolStore> Session<S> {
    pub fn open(config: GameConfig, store: S, seed: u64) -> Self {
        let pool = load_pool(&store, config.economy.min_permanent_pool);
        Self {
            game: Game::new(config, pool, seed),
            store,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (Game, S) {
        (self.game, self.store)
    }

    pub fn apply(&mut self, command: Command) -> bool {
        let accepted = self.game.apply(command);
        self.persist();
        accepted
    }

    pub fn tick(&mut self, dt: Duration) {
        self.game.tick(dt);
    }

    pub fn advance_frame(&mut self, clock: &mut FrameClock, now: Duration) {
        self.game.advance_frame(clock, now);
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.game.drain_signals()
    }

    pub fn reset_permanent_pool(&mut self) -> bool {
        let changed = self.game.reset_permanent_pool();
        self.persist();
        changed
    }

    pub fn remove_permanent_piece(&mut self, kind: PieceKind) -> bool {
        let changed = self.game.remove_permanent_piece(kind);
        self.persist();
        changed
    }

    fn persist(&mut self) {
        if !self.game.take_pool_dirty() {
            return;
        }
        let pool = self.game.progression().permanent_pool().to_vec();
        match save_pool(&mut self.store, &pool) {
            Ok(()) => log::debug!("saved permanent pool ({} kinds)", pool.len()),
            Err(e) => log::warn!("failed to save permanent pool: {e}"),
        }
    }
}
