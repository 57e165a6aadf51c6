pub mod board;
pub mod collision;
pub mod config;
pub mod countdown;
pub mod game;
pub mod hold;
pub mod kicks;
pub mod objectives;
pub mod obstacles;
pub mod phase;
pub mod piece;
pub mod playtest;
pub mod pool_store;
pub mod progression;
pub mod randomizer;
pub mod serde_duration;
pub mod session;
pub mod shapes;
pub mod signals;
pub mod upgrades;

pub use game::{Command, FrameClock, Game, Snapshot};
pub use session::Session;
