use serde::{Deserialize, Serialize};

use super::Judgment;

/// Points of the best grade; every judged note raises the reference score by
/// this much.
pub const MAX_GRADE_POINTS: u32 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub combo: u32,
    pub max_combo: u32,
    pub score: u32,
    pub reference_score: u32,
    pub perfect_count: u32,
    pub good_count: u32,
    pub bad_count: u32,
    pub miss_count: u32,
}

impl Scoreboard {
    pub fn record(&mut self, judgment: Judgment) {
        if judgment.keeps_combo() {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        } else {
            self.combo = 0;
        }
        self.score += judgment.points();
        self.reference_score += MAX_GRADE_POINTS;

        match judgment {
            Judgment::Perfect => self.perfect_count += 1,
            Judgment::Good => self.good_count += 1,
            Judgment::Bad => self.bad_count += 1,
            Judgment::Miss => self.miss_count += 1,
        }
    }

    /// Percentage of the reference score earned so far; 0 before any note.
    pub fn accuracy(&self) -> f64 {
        if self.reference_score == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.reference_score) * 100.0
    }

    pub fn judged_count(&self) -> u32 {
        self.perfect_count + self.good_count + self.bad_count + self.miss_count
    }
}
