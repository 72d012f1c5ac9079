use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::RawSubScores;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoreError {
    #[error("score is not a finite number")]
    NotFinite,
    #[error("score {0} is negative")]
    Negative(f64),
}

/// A score stored once, on the unit interval.
///
/// Raw scores arrive either as `0..=1` or as `0..=100`. Anything strictly
/// greater than `1.0` is read as a percentage; `1.0` itself is a full score.
/// Every displayed form (percent, `x/10`, stars) is derived from [`Score::percent`]
/// so two renderings of the same score can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);
    pub const FULL: Score = Score(1.0);

    pub fn from_unit(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn from_raw(raw: f64) -> Result<Self, ScoreError> {
        if !raw.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if raw < 0.0 {
            return Err(ScoreError::Negative(raw));
        }
        if raw > 1.0 {
            Ok(Self::from_unit(raw / 100.0))
        } else {
            Ok(Self(raw))
        }
    }

    /// Ingests an untrusted raw score, recording invalid input as zero.
    pub fn ingest(raw: f64) -> Self {
        Self::from_raw(raw).unwrap_or_else(|err| {
            warn!(raw, error = %err, "rejected raw score");
            Self::ZERO
        })
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    pub fn out_of_ten(self) -> f64 {
        f64::from(self.percent()) / 10.0
    }

    /// Whole stars out of five.
    pub fn stars(self) -> u8 {
        (f64::from(self.percent()) / 20.0).round() as u8
    }

    pub fn percent_text(self) -> String {
        format!("{}%", self.percent())
    }

    pub fn out_of_ten_text(self) -> String {
        format!("{:.1}/10", self.out_of_ten())
    }

    pub fn star_text(self) -> String {
        let filled = usize::from(self.stars());
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}

impl TryFrom<f64> for Score {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Score::from_raw(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub scenic: Option<Score>,
    pub efficiency: Option<Score>,
    pub preference: Option<Score>,
    pub safety: Option<Score>,
}

impl SubScores {
    pub fn from_raw(raw: &RawSubScores) -> Self {
        Self {
            scenic: raw.scenic.map(Score::ingest),
            efficiency: raw.efficiency.map(Score::ingest),
            preference: raw.preference.map(Score::ingest),
            safety: raw.safety.map(Score::ingest),
        }
    }

    pub fn labelled(&self) -> Vec<(&'static str, Score)> {
        [
            ("Scenery", self.scenic),
            ("Efficiency", self.efficiency),
            ("Preference match", self.preference),
            ("Safety", self.safety),
        ]
        .into_iter()
        .filter_map(|(label, score)| score.map(|score| (label, score)))
        .collect()
    }
}
