//! Server-side score aggregation for multiplayer plays.

mod judgement;
mod processor;

pub use judgement::Judgement;
pub use processor::{ScoreProcessor, ScoreSummary};
