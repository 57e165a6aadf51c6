use serde::{Deserialize, Serialize};

use crate::shapes::PieceKind;
use crate::upgrades::UpgradeId;

/// Warning tone played when an obstacle row is telegraphed.
///
/// Hosts with an audio device should play it as a short sine beep.
pub const OBSTACLE_WARNING_TONE_HZ: f32 = 440.0;
pub const OBSTACLE_WARNING_TONE_MS: u32 = 200;
pub const OBSTACLE_WARNING_TONE_GAIN: f32 = 0.08;

pub const OBSTACLE_WARNING_MESSAGE: &str = "Obstacle row incoming.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneCue {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub gain: f32,
}

impl ToneCue {
    pub fn obstacle_warning() -> Self {
        Self {
            frequency_hz: OBSTACLE_WARNING_TONE_HZ,
            duration_ms: OBSTACLE_WARNING_TONE_MS,
            gain: OBSTACLE_WARNING_TONE_GAIN,
        }
    }
}

/// Advisory events for the host (overlay text, audio, persistence hooks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    ObstacleWarning {
        message: String,
        tone: Option<ToneCue>,
    },
    ObstacleWarningCleared,
    ObstacleInjected {
        columns: Vec<usize>,
        level: u8,
    },
    LinesCleared {
        count: usize,
        with_obstacle: bool,
        points: u64,
    },
    ObstacleRowsWeakened {
        count: usize,
    },
    LevelUp {
        level: u32,
    },
    UpgradeApplied(UpgradeId),
    PieceUnlocked(PieceKind),
    PieceRemoved(PieceKind),
    SecondChanceUsed,
    /// Timed hold cells ran out; these kinds are next in the queue.
    HeldPiecesReturned(Vec<PieceKind>),
    GameOver {
        score: u64,
        level: u32,
    },
    PermanentPoolChanged,
}
