use serde::{Deserialize, Serialize};

/// A single hit-timing grade recorded during play, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Judgement {
    Marvelous,
    Perfect,
    Great,
    Good,
    Okay,
    Miss,
}

impl Judgement {
    pub const ALL: [Judgement; 6] = [
        Judgement::Marvelous,
        Judgement::Perfect,
        Judgement::Great,
        Judgement::Good,
        Judgement::Okay,
        Judgement::Miss,
    ];

    /// Accuracy weight of this grade. Marvelous sets the scale.
    pub const fn weight(self) -> f64 {
        match self {
            Self::Marvelous => 100.0,
            Self::Perfect => 98.25,
            Self::Great => 65.0,
            Self::Good => 25.0,
            Self::Okay => -100.0,
            Self::Miss => -50.0,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn breaks_combo(self) -> bool {
        matches!(self, Self::Miss)
    }
}

impl From<Judgement> for i32 {
    fn from(value: Judgement) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for Judgement {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| format!("unknown judgement {value}"))
    }
}
