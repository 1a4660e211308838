use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::harmony::{chord_for_offset, slots_for_measure, DegreePlan};
use super::rhythm::pick_rhythm_pattern;
use super::voicing::{
    bass_midi_for_role, choose_hand_note_count, choose_melody_midi, enrich_with_chord_tones,
    finalize_hand_notes, harmony_intent, nearest_arp_midi, pick_bass_style, pick_treble_style,
    BassStyle, TrebleStyle, MAX_HAND_NOTES, MAX_HAND_SPAN,
};
use super::{Difficulty, GenParams, Hand};
use crate::core::pitch::{nearest_midi_in_pcs, BASS_REGISTER, TREBLE_REGISTER};
use crate::core::timebase::{beats_from_ticks, NoteDur, Tick};

/// Measures generated past the point where the target quota is satisfied
/// are a defect; this ceiling guarantees termination under pathological
/// parameters.
const MEASURE_CEILING: usize = 512;

/// One onset in one hand's stream. Immutable once emitted; rests carry an
/// empty pitch set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandEvent {
    pub id: String,
    pub start_tick: Tick,
    pub dur: NoteDur,
    pub midis: Vec<u8>,
}

impl HandEvent {
    pub fn is_rest(&self) -> bool {
        self.midis.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetState {
    Pending,
    Waiting,
    Completed,
}

/// One graded moment: the union of both hands' pitches at a tick. Grading
/// state is mutated only by the matcher and reset (not rebuilt) on restart.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub start_tick: Tick,
    pub offset_beats: f32,
    pub midis: Vec<u8>,
    pub hits: BTreeSet<u8>,
    pub mistake_flagged: bool,
    pub state: TargetState,
}

impl Target {
    fn new(start_tick: Tick) -> Self {
        Self {
            id: format!("t-{start_tick}"),
            start_tick,
            offset_beats: beats_from_ticks(start_tick),
            midis: Vec::new(),
            hits: BTreeSet::new(),
            mistake_flagged: false,
            state: TargetState::Pending,
        }
    }

    fn absorb(&mut self, midis: &[u8]) {
        self.midis.extend_from_slice(midis);
        self.midis.sort_unstable();
        self.midis.dedup();
    }

    pub fn all_hit(&self) -> bool {
        self.midis.iter().all(|m| self.hits.contains(m))
    }

    pub fn first_unstruck(&self) -> Option<u8> {
        self.midis.iter().copied().find(|m| !self.hits.contains(m))
    }

    /// Back to initial grading state; pitches are kept.
    pub fn reset(&mut self) {
        self.hits.clear();
        self.mistake_flagged = false;
        self.state = TargetState::Pending;
    }
}

/// A generated exercise: both hand streams plus the graded-target list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Piece {
    pub params: GenParams,
    pub prefer_sharps: bool,
    pub measure_ticks: Tick,
    pub treble: Vec<HandEvent>,
    pub bass: Vec<HandEvent>,
    pub targets: Vec<Target>,
}

impl Piece {
    pub fn measure_count(&self) -> usize {
        let last = self
            .treble
            .iter()
            .chain(&self.bass)
            .map(|e| e.start_tick)
            .max()
            .unwrap_or(0);
        (last / self.measure_ticks) as usize + 1
    }

    pub fn hand(&self, hand: Hand) -> &[HandEvent] {
        match hand {
            Hand::Treble => &self.treble,
            Hand::Bass => &self.bass,
        }
    }
}

fn rest_chance(hand: Hand, difficulty: Difficulty) -> f32 {
    match (hand, difficulty) {
        (Hand::Treble, Difficulty::Easy) => 0.04,
        (Hand::Treble, Difficulty::Medium) => 0.06,
        (Hand::Treble, Difficulty::Hard) => 0.10,
        (Hand::Bass, Difficulty::Easy) => 0.02,
        (Hand::Bass, Difficulty::Medium) => 0.04,
        (Hand::Bass, Difficulty::Hard) => 0.07,
    }
}

struct Assembler<'a, R: Rng + ?Sized> {
    params: GenParams,
    scale_pcs: [u8; 7],
    intent: f32,
    max_hand_notes: usize,
    treble_prev: u8,
    bass_prev: u8,
    treble_prev_chord: Vec<u8>,
    bass_prev_chord: Vec<u8>,
    contour: i8,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Assembler<'a, R> {
    fn new(params: GenParams, rng: &'a mut R) -> Self {
        let scale_pcs = params.key.scale_pcs();
        let intent = harmony_intent(params.max_poly);
        let max_hand_notes = (params.max_poly as usize).clamp(1, MAX_HAND_NOTES);
        let contour = *super::weighted_pick(&[(1.0, -1i8), (2.0, 0), (1.0, 1)], rng);
        Self {
            params,
            scale_pcs,
            intent,
            max_hand_notes,
            treble_prev: 72,
            bass_prev: 48,
            treble_prev_chord: Vec::new(),
            bass_prev_chord: Vec::new(),
            contour,
            rng,
        }
    }

    fn treble_onset(
        &mut self,
        style: TrebleStyle,
        chord_pcs: &[u8],
        strong: bool,
        medium: bool,
        arp_index: &mut usize,
    ) -> Vec<u8> {
        let strong_or_medium = strong || medium;
        if style == TrebleStyle::Arpeggio {
            let pc = chord_pcs[*arp_index % chord_pcs.len()];
            *arp_index += 1;
            let m = nearest_arp_midi(self.treble_prev, pc, self.contour, TREBLE_REGISTER, self.rng);
            self.treble_prev = m;

            let want = choose_hand_note_count(
                self.max_hand_notes,
                self.intent,
                self.params.difficulty,
                strong_or_medium,
                self.rng,
            );
            let prev = if self.treble_prev_chord.is_empty() {
                vec![m]
            } else {
                self.treble_prev_chord.clone()
            };
            let midis = enrich_with_chord_tones(
                &[m],
                chord_pcs,
                &prev,
                TREBLE_REGISTER,
                self.max_hand_notes,
                want,
                self.rng,
            );
            if midis.len() > 1 {
                self.treble_prev_chord = midis.clone();
            }
            return midis;
        }

        let m = choose_melody_midi(
            Some(self.treble_prev),
            chord_pcs,
            &self.scale_pcs,
            TREBLE_REGISTER,
            strong,
            medium,
            self.params.difficulty,
            self.contour,
            self.rng,
        );
        self.treble_prev = m;

        let want = choose_hand_note_count(
            self.max_hand_notes,
            self.intent,
            self.params.difficulty,
            strong_or_medium,
            self.rng,
        );
        let want = match style {
            TrebleStyle::MelodyChords => want.max(2),
            TrebleStyle::MelodyDyads => want.max(2).min(3),
            _ => want,
        };
        let prev = if self.treble_prev_chord.is_empty() {
            vec![m]
        } else {
            self.treble_prev_chord.clone()
        };
        let midis = enrich_with_chord_tones(
            &[m],
            chord_pcs,
            &prev,
            TREBLE_REGISTER,
            self.max_hand_notes,
            want,
            self.rng,
        );
        if style == TrebleStyle::MelodyChords || midis.len() > 1 {
            self.treble_prev_chord = midis.clone();
        }
        midis
    }

    fn bass_onset(
        &mut self,
        style: BassStyle,
        chord_pcs: &[u8],
        strong: bool,
        medium: bool,
        role_index: &mut usize,
    ) -> Vec<u8> {
        let strong_or_medium = strong || medium;
        let bass_cap = self.max_hand_notes.min(3);

        if style == BassStyle::Walking && self.params.difficulty == Difficulty::Hard {
            let step: i32 = if self.rng.random_range(0.0..1.0) < 0.6 {
                if self.rng.random_range(0.0..1.0) < 0.5 { 1 } else { -1 }
            } else if self.rng.random_range(0.0..1.0) < 0.5 {
                2
            } else {
                -2
            };
            let m = nearest_midi_in_pcs(
                self.bass_prev as i32 + step,
                &self.scale_pcs,
                BASS_REGISTER,
            );
            self.bass_prev = m;

            let want = choose_hand_note_count(
                bass_cap,
                self.intent,
                self.params.difficulty,
                strong_or_medium,
                self.rng,
            );
            let prev = if self.bass_prev_chord.is_empty() {
                vec![m]
            } else {
                self.bass_prev_chord.clone()
            };
            let midis = enrich_with_chord_tones(
                &[m],
                chord_pcs,
                &prev,
                BASS_REGISTER,
                bass_cap,
                want,
                self.rng,
            );
            if midis.len() > 1 {
                self.bass_prev_chord = midis.clone();
            }
            return midis;
        }

        let role = if strong { 0 } else if medium { 1 } else { 2 };
        let m = bass_midi_for_role(
            chord_pcs,
            Some(self.bass_prev),
            BASS_REGISTER,
            *role_index + role,
        );
        *role_index += 1;
        self.bass_prev = m;

        let want = choose_hand_note_count(
            self.max_hand_notes.min(4),
            self.intent,
            self.params.difficulty,
            strong_or_medium,
            self.rng,
        );

        match style {
            BassStyle::Octaves if strong && want >= 2 => {
                let octave = BASS_REGISTER.fold(m as i32 + 12);
                let mut midis =
                    finalize_hand_notes(&[m, octave], BASS_REGISTER, 2, MAX_HAND_SPAN);
                if self.intent > 0.55
                    && self.max_hand_notes >= 3
                    && self.rng.random_range(0.0..1.0) < 0.35
                {
                    let prev = if self.bass_prev_chord.is_empty() {
                        midis.clone()
                    } else {
                        self.bass_prev_chord.clone()
                    };
                    midis = enrich_with_chord_tones(
                        &midis,
                        chord_pcs,
                        &prev,
                        BASS_REGISTER,
                        bass_cap,
                        3,
                        self.rng,
                    );
                }
                self.bass_prev_chord = midis.clone();
                midis
            }
            BassStyle::Broken => {
                if strong_or_medium && want >= 2 {
                    let prev = if self.bass_prev_chord.is_empty() {
                        vec![m]
                    } else {
                        self.bass_prev_chord.clone()
                    };
                    let midis = enrich_with_chord_tones(
                        &[m],
                        chord_pcs,
                        &prev,
                        BASS_REGISTER,
                        bass_cap,
                        want.min(3),
                        self.rng,
                    );
                    if midis.len() > 1 {
                        self.bass_prev_chord = midis.clone();
                    }
                    midis
                } else {
                    vec![m]
                }
            }
            _ => {
                let prev = if self.bass_prev_chord.is_empty() {
                    vec![m]
                } else {
                    self.bass_prev_chord.clone()
                };
                let midis = enrich_with_chord_tones(
                    &[m],
                    chord_pcs,
                    &prev,
                    BASS_REGISTER,
                    bass_cap,
                    want.min(3),
                    self.rng,
                );
                if midis.len() > 1 {
                    self.bass_prev_chord = midis.clone();
                }
                midis
            }
        }
    }
}

/// Assemble a piece: measure by measure, both hands, until the requested
/// number of distinct-tick targets exists, then trim to whole measures.
pub fn generate_piece<R: Rng + ?Sized>(params: &GenParams, rng: &mut R) -> Piece {
    let params = params.clamped();
    let time_sig = params.time_sig;
    let measure_ticks = time_sig.measure_ticks();
    let difficulty = params.difficulty;

    let mut asm = Assembler::new(params, rng);
    let mut plan = DegreePlan::new(8, asm.rng);

    let mut treble: Vec<HandEvent> = Vec::new();
    let mut bass: Vec<HandEvent> = Vec::new();
    let mut targets_by_tick: BTreeMap<Tick, Target> = BTreeMap::new();

    let mut global_tick: Tick = 0;
    let mut measure_index: usize = 0;

    while targets_by_tick.len() < params.target_count {
        if measure_index >= MEASURE_CEILING {
            warn!(
                measure_index,
                targets = targets_by_tick.len(),
                "measure ceiling hit before target quota; truncating"
            );
            break;
        }
        plan.ensure_len(measure_index + 8, asm.rng);

        let deg_this = plan.degree(measure_index);
        let deg_next = plan.degree(measure_index + 1);
        let slots = slots_for_measure(measure_ticks, deg_this, deg_next, difficulty, asm.rng);

        let treble_pattern =
            pick_rhythm_pattern(measure_ticks, time_sig, Hand::Treble, difficulty, asm.rng);
        let bass_pattern =
            pick_rhythm_pattern(measure_ticks, time_sig, Hand::Bass, difficulty, asm.rng);

        let treble_style = pick_treble_style(difficulty, asm.intent, asm.rng);
        let bass_style = pick_bass_style(difficulty, asm.intent, asm.rng);

        // Let the line breathe: reconsider the contour at phrase boundaries.
        if measure_index % 4 == 3 && asm.rng.random_range(0.0..1.0) < 0.6 {
            asm.contour = if asm.contour == 0 { -1 } else { -asm.contour };
        }

        let mut arp_index = 0usize;
        let mut tick_in_measure: Tick = 0;
        for &ticks in &treble_pattern {
            let start_tick = global_tick + tick_in_measure;
            let strong = time_sig.is_strong_offset(tick_in_measure);
            let medium = time_sig.is_medium_offset(tick_in_measure);
            let chord_pcs = chord_for_offset(tick_in_measure, &slots, &asm.scale_pcs);

            let midis = if !strong
                && asm.rng.random_range(0.0..1.0) < rest_chance(Hand::Treble, difficulty)
            {
                Vec::new()
            } else {
                asm.treble_onset(treble_style, &chord_pcs, strong, medium, &mut arp_index)
            };

            push_event(&mut treble, &mut targets_by_tick, start_tick, ticks, midis);
            tick_in_measure += ticks;
        }

        let mut role_index = 0usize;
        let mut tick_in_measure: Tick = 0;
        for &ticks in &bass_pattern {
            let start_tick = global_tick + tick_in_measure;
            let strong = time_sig.is_strong_offset(tick_in_measure);
            let medium = time_sig.is_medium_offset(tick_in_measure);
            let chord_pcs = chord_for_offset(tick_in_measure, &slots, &asm.scale_pcs);

            let midis = if !strong
                && asm.rng.random_range(0.0..1.0) < rest_chance(Hand::Bass, difficulty)
            {
                Vec::new()
            } else {
                asm.bass_onset(bass_style, &chord_pcs, strong, medium, &mut role_index)
            };

            push_event(&mut bass, &mut targets_by_tick, start_tick, ticks, midis);
            tick_in_measure += ticks;
        }

        global_tick += measure_ticks;
        measure_index += 1;
    }

    let mut targets: Vec<Target> = targets_by_tick.into_values().collect();
    targets.truncate(params.target_count);

    // Trim to the end of the last measure that still holds a kept target.
    let last_tick = targets.last().map(|t| t.start_tick).unwrap_or(0);
    let keep_until = (last_tick / measure_ticks + 1) * measure_ticks;
    treble.retain(|e| e.start_tick < keep_until);
    bass.retain(|e| e.start_tick < keep_until);

    debug!(
        measures = measure_index,
        treble_events = treble.len(),
        bass_events = bass.len(),
        targets = targets.len(),
        "piece assembled"
    );

    Piece {
        prefer_sharps: params.key.prefer_sharps(),
        params,
        measure_ticks,
        treble,
        bass,
        targets,
    }
}

fn push_event(
    seq: &mut Vec<HandEvent>,
    targets: &mut BTreeMap<Tick, Target>,
    start_tick: Tick,
    ticks: Tick,
    midis: Vec<u8>,
) {
    let dur = NoteDur::from_ticks(ticks).expect("pool durations are renderable");
    if !midis.is_empty() {
        targets
            .entry(start_tick)
            .or_insert_with(|| Target::new(start_tick))
            .absorb(&midis);
    }
    seq.push(HandEvent {
        id: format!("t-{start_tick}"),
        start_tick,
        dur,
        midis,
    });
}
