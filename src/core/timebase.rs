use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Tick = u64;

/// Beats represented by one tick (a sixteenth note).
pub const TICK_BEATS: f32 = 0.25;

pub fn ticks_from_beats(beats: f32) -> Tick {
    let t = (beats / TICK_BEATS).round();
    if t < 1.0 { 1 } else { t as Tick }
}

pub fn beats_from_ticks(ticks: Tick) -> f32 {
    ticks as f32 * TICK_BEATS
}

/// The renderable note durations. Any generated duration must map to one of
/// these; `from_ticks` returning `None` is a generator defect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteDur {
    Whole,
    DottedHalf,
    Half,
    DottedQuarter,
    Quarter,
    DottedEighth,
    Eighth,
    Sixteenth,
}

impl NoteDur {
    pub const ALL_TICKS: [Tick; 8] = [16, 12, 8, 6, 4, 3, 2, 1];

    pub fn from_ticks(ticks: Tick) -> Option<Self> {
        match ticks {
            16 => Some(NoteDur::Whole),
            12 => Some(NoteDur::DottedHalf),
            8 => Some(NoteDur::Half),
            6 => Some(NoteDur::DottedQuarter),
            4 => Some(NoteDur::Quarter),
            3 => Some(NoteDur::DottedEighth),
            2 => Some(NoteDur::Eighth),
            1 => Some(NoteDur::Sixteenth),
            _ => None,
        }
    }

    pub fn ticks(self) -> Tick {
        match self {
            NoteDur::Whole => 16,
            NoteDur::DottedHalf => 12,
            NoteDur::Half => 8,
            NoteDur::DottedQuarter => 6,
            NoteDur::Quarter => 4,
            NoteDur::DottedEighth => 3,
            NoteDur::Eighth => 2,
            NoteDur::Sixteenth => 1,
        }
    }

    pub fn beats(self) -> f32 {
        beats_from_ticks(self.ticks())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    pub num: u8,
    pub den: u8,
}

impl TimeSig {
    pub const FOUR_FOUR: TimeSig = TimeSig { num: 4, den: 4 };

    pub fn beats_per_measure(&self) -> f32 {
        self.num as f32 * (4.0 / self.den as f32)
    }

    pub fn measure_ticks(&self) -> Tick {
        ticks_from_beats(self.beats_per_measure())
    }

    /// Accent grid: strong offsets carry the meter's main pulses.
    pub fn is_strong_offset(&self, offset: Tick) -> bool {
        match (self.num, self.den) {
            (4, 4) => offset == 0 || offset == 8,
            (3, 4) => offset == 0,
            (6, 8) => offset == 0 || offset == 6,
            _ => offset == 0,
        }
    }

    pub fn is_medium_offset(&self, offset: Tick) -> bool {
        match (self.num, self.den) {
            (4, 4) => offset == 4 || offset == 12,
            (3, 4) => offset == 4 || offset == 8,
            (6, 8) => offset == 3 || offset == 9,
            _ => false,
        }
    }
}

impl fmt::Display for TimeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for TimeSig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .split_once('/')
            .ok_or_else(|| format!("invalid time signature: {s}"))?;
        let num: u8 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid time signature: {s}"))?;
        let den: u8 = den
            .trim()
            .parse()
            .map_err(|_| format!("invalid time signature: {s}"))?;
        if num == 0 || den == 0 {
            return Err(format!("invalid time signature: {s}"));
        }
        Ok(TimeSig { num, den })
    }
}
