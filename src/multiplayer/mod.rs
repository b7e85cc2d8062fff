//! Multiplayer match engine.
//!
//! [`MultiplayerEngine`] owns every live [`Game`]. Operations are split by
//! concern: lifecycle and publication in `engine`, settings and roster
//! changes in `actions`, the scheduled start in `countdown`, and play
//! tracking plus match end in `play`.

mod actions;
mod countdown;
pub mod engine;
pub mod game;
mod play;
pub mod settings;


pub use engine::{EngineError, GameHandle, JoinOutcome, MultiplayerEngine};
pub use game::{Game, MatchState};
