use rand::Rng;

use super::{weighted_pick, Difficulty};
use crate::core::pitch::chord_pcs_for_degree;
use crate::core::timebase::Tick;

/// Four-bar progressions in scale degrees, weighted by how common they are.
const PROG_TEMPLATES_4: &[(f32, [u8; 4])] = &[
    (4.0, [1, 5, 6, 4]),
    (3.0, [1, 6, 4, 5]),
    (3.0, [1, 4, 5, 1]),
    (2.0, [6, 4, 1, 5]),
    (2.0, [1, 2, 5, 1]),
    (2.0, [1, 3, 6, 2]),
];

const CADENCE_ENDINGS: &[(f32, [u8; 4])] = &[
    (5.0, [2, 5, 1, 1]),
    (4.0, [4, 5, 1, 1]),
    (3.0, [6, 2, 5, 1]),
];

const CADENCE_CHANCE: f32 = 0.45;

/// Per-measure scale-degree plan, grown lazily in whole phrases and never
/// shrunk.
#[derive(Debug, Clone, Default)]
pub struct DegreePlan {
    degrees: Vec<u8>,
}

impl DegreePlan {
    pub fn new<R: Rng + ?Sized>(measures: usize, rng: &mut R) -> Self {
        let mut plan = Self::default();
        plan.grow_to(measures, rng);
        plan
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    /// Degree for a measure; an index beyond the plan reads as tonic.
    pub fn degree(&self, measure: usize) -> u8 {
        self.degrees.get(measure).copied().unwrap_or(1)
    }

    /// Extend in 8-measure steps until the plan covers `measures`.
    pub fn ensure_len<R: Rng + ?Sized>(&mut self, measures: usize, rng: &mut R) {
        while self.degrees.len() < measures {
            let target = self.degrees.len() + 8;
            self.grow_to(target, rng);
        }
    }

    fn grow_to<R: Rng + ?Sized>(&mut self, measures: usize, rng: &mut R) {
        while self.degrees.len() < measures {
            let remaining = measures - self.degrees.len();
            if remaining < 4 {
                // Trailing partial phrase: settle on the tonic.
                self.degrees.extend(std::iter::repeat(1).take(remaining));
                break;
            }
            let cadence = !self.degrees.is_empty() && rng.random_range(0.0..1.0) < CADENCE_CHANCE;
            let chunk = if cadence {
                weighted_pick(CADENCE_ENDINGS, rng)
            } else {
                weighted_pick(PROG_TEMPLATES_4, rng)
            };
            self.degrees.extend_from_slice(chunk);
        }
    }
}

/// Chord-tone set active from `tick` until the next slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarmonySlot {
    pub tick: Tick,
    pub degree: u8,
    pub seventh: bool,
}

/// One or two harmony slots for a measure. Easy difficulty never splits the
/// measure; medium/hard add a passing harmony at the midpoint.
pub fn slots_for_measure<R: Rng + ?Sized>(
    measure_ticks: Tick,
    degree_this: u8,
    degree_next: u8,
    difficulty: Difficulty,
    rng: &mut R,
) -> Vec<HarmonySlot> {
    let mut slots = vec![HarmonySlot {
        tick: 0,
        degree: degree_this,
        seventh: false,
    }];

    let split_chance = match difficulty {
        Difficulty::Easy => 0.0,
        Difficulty::Medium => 0.35,
        Difficulty::Hard => 0.55,
    };
    if rng.random_range(0.0..1.0) < split_chance {
        let passing = *weighted_pick(
            &[
                (4.0, 5u8),
                (3.0, 2),
                (2.0, 4),
                (1.0, if degree_next == 0 { 5 } else { degree_next }),
            ],
            rng,
        );
        slots.push(HarmonySlot {
            tick: measure_ticks / 2,
            degree: passing,
            seventh: passing == 5 && rng.random_range(0.0..1.0) < 0.65,
        });
    }

    // Dominant color on the downbeat slot.
    if degree_this == 5 && difficulty != Difficulty::Easy && rng.random_range(0.0..1.0) < 0.45 {
        slots[0].seventh = true;
    }

    slots.sort_by_key(|s| s.tick);
    slots
}

/// Resolve the governing chord for an offset: the highest-offset slot at or
/// before it.
pub fn chord_for_offset(offset: Tick, slots: &[HarmonySlot], scale_pcs: &[u8; 7]) -> Vec<u8> {
    let mut chosen = slots[0];
    for s in slots {
        if s.tick <= offset {
            chosen = *s;
        }
    }
    chord_pcs_for_degree(chosen.degree, scale_pcs, chosen.seventh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn templates_stay_on_diatonic_degrees() {
        for (_, chunk) in PROG_TEMPLATES_4.iter().chain(CADENCE_ENDINGS) {
            for &d in chunk {
                assert!((1..=7).contains(&d));
            }
        }
    }

    #[test]
    fn out_of_plan_measures_read_tonic() {
        let mut rng = SmallRng::seed_from_u64(3);
        let plan = DegreePlan::new(8, &mut rng);
        assert_eq!(plan.degree(1000), 1);
    }
}
