use rand::Rng;
use std::collections::HashMap;

use super::{weighted_pick, Difficulty, Hand};
use crate::core::timebase::{NoteDur, Tick, TimeSig};

/// Widest allowed pool; contains the single tick, so any integer budget is
/// exactly fillable.
pub const MAX_POOL: [Tick; 8] = NoteDur::ALL_TICKS;

/// Per-difficulty duration pools; bass leans on longer values.
pub fn duration_pool(hand: Hand, difficulty: Difficulty) -> &'static [Tick] {
    match (hand, difficulty) {
        (Hand::Treble, Difficulty::Easy) => &[8, 6, 4, 2],
        (Hand::Treble, Difficulty::Medium) => &[8, 6, 4, 3, 2],
        (Hand::Treble, Difficulty::Hard) => &[8, 6, 4, 3, 2, 1],
        (Hand::Bass, Difficulty::Easy) => &[12, 8, 6, 4, 2],
        (Hand::Bass, Difficulty::Medium) => &[12, 8, 6, 4, 3, 2],
        (Hand::Bass, Difficulty::Hard) => &[12, 8, 6, 4, 3, 2, 1],
    }
}

const TEMPLATES_44: &[&[Tick]] = &[
    &[4, 4, 4, 4],
    &[8, 4, 4],
    &[4, 4, 8],
    &[2, 2, 2, 2, 4, 4],
    &[4, 2, 2, 4, 4],
    &[3, 1, 4, 4, 4],
    &[2, 2, 2, 2, 2, 2, 2, 2],
    &[1, 1, 2, 4, 4, 4],
];

const TEMPLATES_34: &[&[Tick]] = &[
    &[4, 4, 4],
    &[6, 6],
    &[4, 2, 2, 4],
    &[2, 2, 2, 2, 2, 2],
    &[3, 1, 4, 4],
];

const TEMPLATES_68: &[&[Tick]] = &[&[2, 2, 2, 2, 2, 2], &[3, 3, 3, 3], &[6, 6]];

fn templates_for(time_sig: TimeSig) -> &'static [&'static [Tick]] {
    match (time_sig.num, time_sig.den) {
        (3, 4) => TEMPLATES_34,
        (6, 8) => TEMPLATES_68,
        _ => TEMPLATES_44,
    }
}

fn template_weight(pattern: &[Tick], hand: Hand, difficulty: Difficulty) -> f32 {
    match hand {
        // Bass keeps the short, simple patterns most of the time.
        Hand::Bass => {
            let simple = if pattern.len() <= 3 { 4.0 } else { 1.0 };
            let diff = match difficulty {
                Difficulty::Easy => 2.0,
                Difficulty::Medium => 1.5,
                Difficulty::Hard => 1.0,
            };
            simple * diff
        }
        Hand::Treble => {
            let has_16th = pattern.contains(&1);
            match difficulty {
                Difficulty::Easy => {
                    if pattern.len() <= 4 && !has_16th {
                        3.0
                    } else {
                        1.0
                    }
                }
                Difficulty::Medium => {
                    if pattern.len() <= 6 {
                        2.0
                    } else {
                        1.0
                    }
                }
                Difficulty::Hard => {
                    if has_16th {
                        2.5
                    } else {
                        1.5
                    }
                }
            }
        }
    }
}

/// Pick a rhythm for one measure of one hand: an idiomatic template when one
/// sums to the budget, otherwise the general filler over the hand's pool.
pub fn pick_rhythm_pattern<R: Rng + ?Sized>(
    measure_ticks: Tick,
    time_sig: TimeSig,
    hand: Hand,
    difficulty: Difficulty,
    rng: &mut R,
) -> Vec<Tick> {
    let candidates: Vec<(f32, &[Tick])> = templates_for(time_sig)
        .iter()
        .filter(|p| p.iter().sum::<Tick>() == measure_ticks)
        .map(|p| (template_weight(p, hand, difficulty), *p))
        .collect();
    if !candidates.is_empty() {
        return weighted_pick(&candidates, rng).to_vec();
    }
    fill_measure(measure_ticks, duration_pool(hand, difficulty), rng)
}

/// Partition `measure_ticks` into an exact-sum sequence of pool durations.
/// Feasibility is memoized per call; an infeasible pool retries with
/// `MAX_POOL`, which always succeeds.
pub fn fill_measure<R: Rng + ?Sized>(measure_ticks: Tick, pool: &[Tick], rng: &mut R) -> Vec<Tick> {
    let mut pool: Vec<Tick> = pool.iter().copied().filter(|&t| t > 0).collect();
    pool.sort_unstable();
    pool.dedup();

    let mut memo: HashMap<Tick, bool> = HashMap::new();
    if pool.is_empty() || !can_fill(measure_ticks, &pool, &mut memo) {
        return fill_measure(measure_ticks, &MAX_POOL, rng);
    }

    let mut out = Vec::new();
    let mut rem = measure_ticks;
    let mut guard = 0;
    while rem > 0 && guard < 512 {
        guard += 1;
        let options: Vec<Tick> = pool
            .iter()
            .copied()
            .filter(|&t| t <= rem && can_fill(rem - t, &pool, &mut memo))
            .collect();
        // Non-empty by the feasibility check above.
        let Some(&pick) = options.get(rng.random_range(0..options.len().max(1))) else {
            break;
        };
        out.push(pick);
        rem -= pick;
    }
    out
}

fn can_fill(rem: Tick, pool: &[Tick], memo: &mut HashMap<Tick, bool>) -> bool {
    if rem == 0 {
        return true;
    }
    if let Some(&ok) = memo.get(&rem) {
        return ok;
    }
    let ok = pool
        .iter()
        .any(|&t| t <= rem && can_fill(rem - t, pool, memo));
    memo.insert(rem, ok);
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn templates_sum_to_their_meter() {
        for p in TEMPLATES_44 {
            assert_eq!(p.iter().sum::<Tick>(), 16, "{p:?}");
        }
        for p in TEMPLATES_34 {
            assert_eq!(p.iter().sum::<Tick>(), 12, "{p:?}");
        }
        for p in TEMPLATES_68 {
            assert_eq!(p.iter().sum::<Tick>(), 12, "{p:?}");
        }
    }

    #[test]
    fn every_pool_tick_is_renderable() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            for hand in [Hand::Treble, Hand::Bass] {
                for &t in duration_pool(hand, difficulty) {
                    assert!(NoteDur::from_ticks(t).is_some(), "{t} unmapped");
                }
            }
        }
    }

    #[test]
    fn filler_hits_budget_exactly() {
        let mut rng = SmallRng::seed_from_u64(11);
        for budget in [12u64, 14, 16, 20] {
            let seq = fill_measure(budget, &[8, 6, 4, 3, 2], &mut rng);
            assert_eq!(seq.iter().sum::<Tick>(), budget);
        }
    }
}
