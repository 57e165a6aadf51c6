use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Ready,
    Playing,
    Paused,
    /// Level-up offer open; the simulation is frozen.
    Choosing,
    RemovingPiece,
    /// Run lost with unkept unlocks; game over is final once this resolves.
    KeepingPiece,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEvent {
    Start,
    Pause,
    Resume,
    LevelUp,
    ChoiceDone,
    OpenRemoval,
    RemovalDone,
    ToppedOut { keep_choice: bool },
    KeepDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEffect {
    None,
    ResetRun,
    /// Drop any pending obstacle row.
    CancelTelegraph,
    /// Restart the frame clock so the pause is not counted.
    ResumeClock,
    FinalizeGameOver,
}

impl GamePhase {
    /// Pure transition function for the run lifecycle.
    ///
    /// Side effects (resetting the run, dropping a telegraph) are returned as a `PhaseEffect`
    /// for the caller to perform.
    pub fn handle(self, event: PhaseEvent) -> (GamePhase, PhaseEffect) {
        use GamePhase::*;
        match (self, event) {
            (Ready | GameOver | Paused, PhaseEvent::Start) => (Playing, PhaseEffect::ResetRun),

            (Playing, PhaseEvent::Pause) => (Paused, PhaseEffect::CancelTelegraph),
            (Paused, PhaseEvent::Resume) => (Playing, PhaseEffect::ResumeClock),

            (Playing, PhaseEvent::LevelUp) => (Choosing, PhaseEffect::CancelTelegraph),
            (Choosing, PhaseEvent::ChoiceDone) => (Playing, PhaseEffect::ResumeClock),
            (Choosing, PhaseEvent::OpenRemoval) => (RemovingPiece, PhaseEffect::None),
            (RemovingPiece, PhaseEvent::RemovalDone) => (Playing, PhaseEffect::ResumeClock),

            (Playing, PhaseEvent::ToppedOut { keep_choice: true }) => {
                (KeepingPiece, PhaseEffect::CancelTelegraph)
            }
            (Playing, PhaseEvent::ToppedOut { keep_choice: false }) => {
                (GameOver, PhaseEffect::FinalizeGameOver)
            }
            (KeepingPiece, PhaseEvent::KeepDone) => (GameOver, PhaseEffect::FinalizeGameOver),

            // Ignore irrelevant events in the current state.
            (state, _) => (state, PhaseEffect::None),
        }
    }

    pub fn is_playing(self) -> bool {
        self == GamePhase::Playing
    }

    /// A modal choice is open.
    pub fn is_choosing(self) -> bool {
        matches!(
            self,
            GamePhase::Choosing | GamePhase::RemovingPiece | GamePhase::KeepingPiece
        )
    }
}
