use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Scoreboard;

/// Letter rank for a finished play.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    P,
    SSS,
    SS,
    S,
    AAA,
    AA,
    A,
    B,
    C,
    D,
}

impl Rank {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 100.0 {
            Self::P
        } else if accuracy > 99.5 {
            Self::SSS
        } else if accuracy > 99.0 {
            Self::SS
        } else if accuracy > 98.0 {
            Self::S
        } else if accuracy > 95.0 {
            Self::AAA
        } else if accuracy > 92.0 {
            Self::AA
        } else if accuracy > 88.0 {
            Self::A
        } else if accuracy > 80.0 {
            Self::B
        } else if accuracy > 60.0 {
            Self::C
        } else {
            Self::D
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::P => "P",
            Self::SSS => "SSS",
            Self::SS => "SS",
            Self::S => "S",
            Self::AAA => "AAA",
            Self::AA => "AA",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        };
        f.write_str(label)
    }
}

/// Outcome of a play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayResult {
    pub accuracy: f64,
    pub rank: Rank,
    pub score: u32,
    pub max_combo: u32,
    pub perfect_count: u32,
    pub good_count: u32,
    pub bad_count: u32,
    pub miss_count: u32,
}

impl PlayResult {
    pub fn from_scoreboard(board: &Scoreboard) -> Self {
        let accuracy = board.accuracy();
        Self {
            accuracy,
            rank: Rank::from_accuracy(accuracy),
            score: board.score,
            max_combo: board.max_combo,
            perfect_count: board.perfect_count,
            good_count: board.good_count,
            bad_count: board.bad_count,
            miss_count: board.miss_count,
        }
    }

    /// Whether this result should replace `previous` as the best one.
    pub fn improves_on(&self, previous: &PlayResult) -> bool {
        self.accuracy > previous.accuracy
    }
}
