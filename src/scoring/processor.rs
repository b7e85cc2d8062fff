use serde::Serialize;

use super::judgement::Judgement;
use crate::protocol::Modifiers;

/// Accuracy at which performance rating equals the map difficulty.
const PERFORMANCE_ACCURACY_BASELINE: f64 = 98.0;
const PERFORMANCE_EXPONENT: i32 = 6;

/// Final numbers for one completed play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub accuracy: f64,
    pub performance_rating: f64,
    pub max_combo: u32,
    pub total_judgements: u32,
    /// Tallies indexed by grade, marvelous first.
    pub counts: [u32; 6],
}

/// Accumulates judgements for a single play session.
///
/// Accuracy and performance rating are recomputed from the integer tallies
/// after every batch, so the result depends only on the judgement sequence and
/// never on how it was chunked.
#[derive(Debug, Clone)]
pub struct ScoreProcessor {
    difficulty_rating: f64,
    modifiers: Modifiers,
    counts: [u32; 6],
    combo: u32,
    max_combo: u32,
    accuracy: f64,
    performance_rating: f64,
}

impl ScoreProcessor {
    pub fn new(difficulty_rating: f64, modifiers: Modifiers) -> Self {
        Self {
            difficulty_rating,
            modifiers,
            counts: [0; 6],
            combo: 0,
            max_combo: 0,
            accuracy: 0.0,
            performance_rating: 0.0,
        }
    }

    pub fn add_judgements(&mut self, judgements: &[Judgement]) {
        if judgements.is_empty() {
            return;
        }

        for judgement in judgements {
            self.counts[judgement.index()] = self.counts[judgement.index()].saturating_add(1);
            if judgement.breaks_combo() {
                self.combo = 0;
            } else {
                self.combo = self.combo.saturating_add(1);
                self.max_combo = self.max_combo.max(self.combo);
            }
        }

        self.accuracy = self.compute_accuracy();
        self.performance_rating = self.difficulty_rating
            * (self.accuracy / PERFORMANCE_ACCURACY_BASELINE).powi(PERFORMANCE_EXPONENT);
    }

    fn compute_accuracy(&self) -> f64 {
        let total = self.total_judgements();
        if total == 0 {
            return 0.0;
        }

        let weighted: f64 = Judgement::ALL
            .iter()
            .map(|judgement| f64::from(self.counts[judgement.index()]) * judgement.weight())
            .sum();
        let scale = Judgement::Marvelous.weight();
        (weighted / (f64::from(total) * scale)).max(0.0) * scale
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn performance_rating(&self) -> f64 {
        self.performance_rating
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn difficulty_rating(&self) -> f64 {
        self.difficulty_rating
    }

    pub fn count(&self, judgement: Judgement) -> u32 {
        self.counts[judgement.index()]
    }

    pub fn total_judgements(&self) -> u32 {
        self.counts.iter().copied().fold(0u32, u32::saturating_add)
    }

    pub fn result(&self) -> ScoreSummary {
        ScoreSummary {
            accuracy: self.accuracy,
            performance_rating: self.performance_rating,
            max_combo: self.max_combo,
            total_judgements: self.total_judgements(),
            counts: self.counts,
        }
    }
}
