use rand::seq::SliceRandom;
use rand::Rng;

use super::{weighted_pick, Difficulty};
use crate::core::pitch::{nearest_midi_in_pcs, nearest_midi_with_pc, Register};

/// Hard cap on simultaneous notes in one hand.
pub const MAX_HAND_NOTES: usize = 5;
/// Hard cap on a voicing's span: a ninth.
pub const MAX_HAND_SPAN: i32 = 14;

/// Texture-density scalar derived from the polyphony setting: 1 note maps to
/// 0, 7+ notes map to 1.
pub fn harmony_intent(max_poly: u8) -> f32 {
    ((max_poly as f32 - 1.0) / 6.0).clamp(0.0, 1.0)
}

/// How many notes this onset should carry. Chord probability rises with
/// intent and difficulty and on accented beats; larger sizes gain weight
/// exponentially as intent grows.
pub fn choose_hand_note_count<R: Rng + ?Sized>(
    max_hand_notes: usize,
    intent: f32,
    difficulty: Difficulty,
    strong_or_medium: bool,
    rng: &mut R,
) -> usize {
    if max_hand_notes <= 1 {
        return 1;
    }

    let diff_boost = match difficulty {
        Difficulty::Hard => 0.15,
        Difficulty::Medium => 0.08,
        Difficulty::Easy => 0.0,
    };
    let base = if strong_or_medium { 0.35 } else { 0.18 };
    let p_chord = (base + diff_boost + 0.55 * intent).clamp(0.0, 0.92);
    if rng.random_range(0.0..1.0) > p_chord {
        return 1;
    }

    let alpha = 0.35 + 1.6 * intent;
    let weights: Vec<(f32, usize)> = (2..=max_hand_notes)
        .map(|k| ((alpha * (k as f32 - 2.0)).exp(), k))
        .collect();
    *weighted_pick(&weights, rng)
}

fn step_weights(difficulty: Difficulty) -> &'static [(f32, i32)] {
    match difficulty {
        Difficulty::Easy => &[(8.0, 1), (8.0, 2), (2.0, 3), (1.0, 5)],
        Difficulty::Medium => &[(7.0, 1), (7.0, 2), (3.0, 3), (2.0, 5), (1.0, 7)],
        Difficulty::Hard => &[(6.0, 1), (6.0, 2), (4.0, 3), (3.0, 5), (2.0, 7)],
    }
}

/// Pick the next melody pitch: a difficulty-weighted step in the prevailing
/// contour direction (70% adherence), snapped to chord tones on strong beats,
/// chord-or-scale on medium beats, and the scale otherwise.
#[allow(clippy::too_many_arguments)]
pub fn choose_melody_midi<R: Rng + ?Sized>(
    prev: Option<u8>,
    chord_pcs: &[u8],
    scale_pcs: &[u8; 7],
    register: Register,
    strong: bool,
    medium: bool,
    difficulty: Difficulty,
    contour: i8,
    rng: &mut R,
) -> u8 {
    let base = prev.map(|m| m as i32).unwrap_or_else(|| register.center());

    let step = *weighted_pick(step_weights(difficulty), rng);
    let dir: i32 = if contour == 0 {
        if rng.random_range(0.0..1.0) < 0.5 {
            -1
        } else {
            1
        }
    } else if rng.random_range(0.0..1.0) < 0.7 {
        contour as i32
    } else {
        -(contour as i32)
    };
    let target = base + dir * step;

    let snapped = if strong {
        nearest_midi_in_pcs(target, chord_pcs, register)
    } else if medium && rng.random_range(0.0..1.0) < 0.6 {
        nearest_midi_in_pcs(target, chord_pcs, register)
    } else {
        nearest_midi_in_pcs(target, scale_pcs, register)
    };
    register.fold(snapped as i32)
}

/// Fold the outer voices inward by octaves until the span fits, preferring
/// to keep everything in-register over keeping the widest voicing.
fn reduce_span_by_octaves(notes: &mut Vec<u8>, register: Register, max_span: i32) {
    notes.sort_unstable();
    let mut guard = 0;
    while notes.len() >= 2 && guard < 32 {
        guard += 1;
        let low = notes[0] as i32;
        let high = notes[notes.len() - 1] as i32;
        if high - low <= max_span {
            break;
        }
        if high - 12 >= low && high - 12 >= register.lo as i32 {
            let n = notes.len();
            notes[n - 1] = (high - 12) as u8;
            notes.sort_unstable();
            continue;
        }
        if low + 12 <= high && low + 12 <= register.hi as i32 {
            notes[0] = (low + 12) as u8;
            notes.sort_unstable();
            continue;
        }
        break;
    }
}

fn drop_farthest_from_midpoint(notes: &mut Vec<u8>) {
    let low = notes[0] as f32;
    let high = notes[notes.len() - 1] as f32;
    let center = (low + high) / 2.0;
    if (high - center).abs() >= (low - center).abs() {
        notes.pop();
    } else {
        notes.remove(0);
    }
}

/// Enforce the hand invariants on an arbitrary pitch collection: dedupe,
/// fold into the register, cap the count, then bring the span under the cap
/// by octave folding and, failing that, by dropping outer pitches.
pub fn finalize_hand_notes(
    midis: &[u8],
    register: Register,
    max_notes: usize,
    max_span: i32,
) -> Vec<u8> {
    let mut notes: Vec<u8> = midis.iter().map(|&m| register.fold(m as i32)).collect();
    notes.sort_unstable();
    notes.dedup();

    while notes.len() > max_notes.max(1) {
        drop_farthest_from_midpoint(&mut notes);
    }

    reduce_span_by_octaves(&mut notes, register, max_span);
    notes.dedup();
    while notes.len() >= 2 && (notes[notes.len() - 1] as i32 - notes[0] as i32) > max_span {
        drop_farthest_from_midpoint(&mut notes);
    }
    notes
}

/// Place chord tones for one hand near the previous voicing's centroid with
/// closed spacing, doubling the root or fifth when more notes than distinct
/// pitch classes are wanted.
pub fn voice_chord_for_hand<R: Rng + ?Sized>(
    chord_pcs: &[u8],
    prev_voicing: &[u8],
    register: Register,
    max_notes: usize,
    prefer_closed: bool,
    rng: &mut R,
) -> Vec<u8> {
    if chord_pcs.is_empty() {
        return Vec::new();
    }
    let center = if prev_voicing.is_empty() {
        register.center()
    } else {
        let sum: i32 = prev_voicing.iter().map(|&m| m as i32).sum();
        (sum as f32 / prev_voicing.len() as f32).round() as i32
    };

    let desired = max_notes.clamp(1, MAX_HAND_NOTES);

    let mut pcs = chord_pcs.to_vec();
    pcs.shuffle(rng);
    pcs.truncate(desired.clamp(1, chord_pcs.len()));

    let mut notes: Vec<u8> = pcs
        .iter()
        .map(|&pc| register.fold(nearest_midi_with_pc(center, pc)))
        .collect();

    while notes.len() < desired {
        let pc = if rng.random_range(0.0..1.0) < 0.5 {
            chord_pcs[0]
        } else {
            chord_pcs.get(2).copied().unwrap_or(chord_pcs[0])
        };
        let spread = if prefer_closed { 4 } else { 8 };
        notes.push(register.fold(nearest_midi_with_pc(center + spread, pc)));
    }

    let mut notes = finalize_hand_notes(&notes, register, MAX_HAND_NOTES, MAX_HAND_SPAN);

    // Extreme registers can fold everything onto one rejected pitch; fall
    // back to a single safe chord root near the center.
    if notes.is_empty() {
        notes = vec![register.fold(nearest_midi_with_pc(center, chord_pcs[0]))];
    }

    let hard_cap = MAX_HAND_NOTES.min(max_notes).max(1);
    notes.truncate(hard_cap);
    notes
}

/// Grow a melodic seed toward `want_count` notes with chord tones anchored
/// at the previous voicing, then re-finalize the merged set.
#[allow(clippy::too_many_arguments)]
pub fn enrich_with_chord_tones<R: Rng + ?Sized>(
    base_notes: &[u8],
    chord_pcs: &[u8],
    prev_voicing: &[u8],
    register: Register,
    max_hand_notes: usize,
    want_count: usize,
    rng: &mut R,
) -> Vec<u8> {
    if base_notes.is_empty() {
        return Vec::new();
    }
    let want = want_count.clamp(1, max_hand_notes.max(1));
    if want <= base_notes.len() {
        return finalize_hand_notes(base_notes, register, max_hand_notes, MAX_HAND_SPAN);
    }

    let anchor = if prev_voicing.is_empty() {
        base_notes
    } else {
        prev_voicing
    };
    let chord_notes = voice_chord_for_hand(chord_pcs, anchor, register, want, true, rng);

    let mut merged = chord_notes;
    merged.extend_from_slice(base_notes);
    finalize_hand_notes(&merged, register, max_hand_notes, MAX_HAND_SPAN)
}

/// Next arpeggio pitch: the cycled chord pitch class placed nearest the
/// previous pitch, nudged one or two semitones along the contour before
/// snapping.
pub fn nearest_arp_midi<R: Rng + ?Sized>(
    prev: u8,
    pc: u8,
    contour: i8,
    register: Register,
    rng: &mut R,
) -> u8 {
    let nudge = if contour == 0 {
        0
    } else {
        let span = if rng.random_range(0.0..1.0) < 0.7 { 1 } else { 2 };
        contour as i32 * span
    };
    register.fold(nearest_midi_with_pc(prev as i32 + nudge, pc))
}

/// Walking-bass role cycle: root, fifth, third, root, each resolved to the
/// chord tone nearest the previous bass pitch.
pub fn bass_midi_for_role(
    chord_pcs: &[u8],
    prev: Option<u8>,
    register: Register,
    role_index: usize,
) -> u8 {
    let root = chord_pcs.first().copied().unwrap_or(0);
    let third = chord_pcs.get(1).copied().unwrap_or(root);
    let fifth = chord_pcs.get(2).copied().unwrap_or(root);
    let role_pc = [root, fifth, third, root][role_index % 4];

    let target = prev.map(|m| m as i32).unwrap_or_else(|| register.center());
    register.fold(nearest_midi_with_pc(target, role_pc))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrebleStyle {
    Melody,
    MelodyDyads,
    Arpeggio,
    MelodyChords,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BassStyle {
    Root,
    Octaves,
    Broken,
    Walking,
}

/// Per-measure treble texture; higher intent shifts weight toward chords.
pub fn pick_treble_style<R: Rng + ?Sized>(
    difficulty: Difficulty,
    intent: f32,
    rng: &mut R,
) -> TrebleStyle {
    let easy = difficulty == Difficulty::Easy;
    let hard = difficulty == Difficulty::Hard;
    let b = intent;
    *weighted_pick(
        &[
            (
                (if easy { 7.0 } else { 4.0 }) * (1.0 - 0.55 * b),
                TrebleStyle::Melody,
            ),
            (
                (if easy { 2.0 } else { 3.0 }) * (1.0 + 0.90 * b),
                TrebleStyle::MelodyDyads,
            ),
            (
                (if easy { 1.0 } else { 3.0 }) * (1.0 + 0.50 * b),
                TrebleStyle::Arpeggio,
            ),
            (
                (if hard { 2.0 } else { 0.8 }) * (0.6 + 2.0 * b),
                TrebleStyle::MelodyChords,
            ),
        ],
        rng,
    )
}

pub fn pick_bass_style<R: Rng + ?Sized>(
    difficulty: Difficulty,
    intent: f32,
    rng: &mut R,
) -> BassStyle {
    let easy = difficulty == Difficulty::Easy;
    let hard = difficulty == Difficulty::Hard;
    let b = intent;
    *weighted_pick(
        &[
            (
                (if easy { 6.0 } else { 3.0 }) * (1.0 - 0.35 * b),
                BassStyle::Root,
            ),
            (
                (if easy { 2.0 } else { 3.0 }) * (1.0 + 0.40 * b),
                BassStyle::Octaves,
            ),
            (
                (if easy { 2.0 } else { 3.0 }) * (1.0 + 0.75 * b),
                BassStyle::Broken,
            ),
            (
                (if hard { 2.0 } else { 1.0 }) * (1.0 + 0.35 * b),
                BassStyle::Walking,
            ),
        ],
        rng,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pitch::{BASS_REGISTER, TREBLE_REGISTER};

    #[test]
    fn intent_is_linear_and_clamped() {
        assert_eq!(harmony_intent(1), 0.0);
        assert_eq!(harmony_intent(7), 1.0);
        assert_eq!(harmony_intent(10), 1.0);
        assert!((harmony_intent(4) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn finalize_enforces_count_and_span() {
        let wide = [36u8, 50, 60, 62, 64, 70, 88];
        let out = finalize_hand_notes(&wide, TREBLE_REGISTER, MAX_HAND_NOTES, MAX_HAND_SPAN);
        assert!(!out.is_empty());
        assert!(out.len() <= MAX_HAND_NOTES);
        if out.len() >= 2 {
            assert!((out[out.len() - 1] as i32 - out[0] as i32) <= MAX_HAND_SPAN);
        }
        for m in out {
            assert!(TREBLE_REGISTER.contains(m));
        }
    }

    #[test]
    fn bass_role_cycle_resolves_to_chord_tones() {
        let chord = [0u8, 4, 7];
        for role in 0..8 {
            let m = bass_midi_for_role(&chord, Some(48), BASS_REGISTER, role);
            assert!(BASS_REGISTER.contains(m));
            assert!(chord.contains(&(m % 12)));
        }
    }
}
