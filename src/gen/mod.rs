pub mod harmony;
pub mod piece;
pub mod rhythm;
pub mod voicing;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::key::Key;
use crate::core::timebase::TimeSig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("unknown difficulty: {s}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hand {
    Treble,
    Bass,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GenParams {
    pub key: Key,
    pub time_sig: TimeSig,
    pub difficulty: Difficulty,
    /// 1..=10; values above five raise harmony intent but the per-hand note
    /// count stays capped at five.
    pub max_poly: u8,
    pub target_count: usize,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            key: Key::C,
            time_sig: TimeSig::FOUR_FOUR,
            difficulty: Difficulty::Easy,
            max_poly: 4,
            target_count: 24,
        }
    }
}

impl GenParams {
    pub fn clamped(mut self) -> Self {
        self.max_poly = self.max_poly.clamp(1, 10);
        self.target_count = self.target_count.max(1);
        self
    }
}

/// Weighted pick over `(weight, value)` pairs. Weights are finite and
/// non-negative by construction; a degenerate table falls back to the last
/// entry, matching the behavior of a cumulative-sum walk.
pub(crate) fn weighted_pick<'a, T, R: Rng + ?Sized>(items: &'a [(f32, T)], rng: &mut R) -> &'a T {
    debug_assert!(!items.is_empty());
    match WeightedIndex::new(items.iter().map(|(w, _)| w.max(0.0))) {
        Ok(dist) => &items[dist.sample(rng)].1,
        Err(_) => &items[items.len() - 1].1,
    }
}
