use rand::rngs::SmallRng;
use rand::SeedableRng;

use sightline::core::key::Key;
use sightline::core::pitch::{chord_pcs_for_degree, BASS_REGISTER, TREBLE_REGISTER};
use sightline::gen::voicing::{
    choose_hand_note_count, choose_melody_midi, enrich_with_chord_tones, voice_chord_for_hand,
    MAX_HAND_NOTES, MAX_HAND_SPAN,
};
use sightline::gen::Difficulty;

#[test]
fn note_count_respects_the_hand_cap() {
    let mut rng = SmallRng::seed_from_u64(10);
    for max in 1..=MAX_HAND_NOTES {
        for _ in 0..200 {
            let n = choose_hand_note_count(max, 1.0, Difficulty::Hard, true, &mut rng);
            assert!((1..=max).contains(&n));
        }
    }
}

#[test]
fn single_note_hands_never_get_chords() {
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..100 {
        assert_eq!(
            choose_hand_note_count(1, 1.0, Difficulty::Hard, true, &mut rng),
            1
        );
    }
}

#[test]
fn chord_voicings_stay_inside_register_span_and_chord() {
    let mut rng = SmallRng::seed_from_u64(12);
    let scale = Key::Eb.scale_pcs();
    for degree in 1..=7u8 {
        let chord = chord_pcs_for_degree(degree, &scale, degree == 5);
        for _ in 0..100 {
            let v = voice_chord_for_hand(&chord, &[72], TREBLE_REGISTER, 5, true, &mut rng);
            assert!(!v.is_empty());
            assert!(v.len() <= MAX_HAND_NOTES);
            let span = *v.last().unwrap() as i32 - v[0] as i32;
            assert!(span <= MAX_HAND_SPAN, "degree {degree}: span {span}");
            for &m in &v {
                assert!(TREBLE_REGISTER.contains(m));
                assert!(chord.contains(&(m % 12)), "degree {degree}: {m} off-chord");
            }
        }
    }
}

#[test]
fn enrichment_never_exceeds_the_requested_count() {
    let mut rng = SmallRng::seed_from_u64(13);
    let chord = chord_pcs_for_degree(1, &Key::C.scale_pcs(), false);
    for want in 1..=MAX_HAND_NOTES {
        for _ in 0..100 {
            let v = enrich_with_chord_tones(&[48], &chord, &[48], BASS_REGISTER, 3, want, &mut rng);
            assert!(!v.is_empty());
            assert!(v.len() <= 3, "bass cap is 3, got {}", v.len());
            for &m in &v {
                assert!(BASS_REGISTER.contains(m));
            }
        }
    }
}

#[test]
fn melody_steps_stay_on_scale_or_chord() {
    let mut rng = SmallRng::seed_from_u64(14);
    let scale = Key::A.scale_pcs();
    let chord = chord_pcs_for_degree(4, &scale, false);
    let mut prev = 72u8;
    for i in 0..400 {
        let strong = i % 4 == 0;
        let medium = i % 4 == 2;
        let m = choose_melody_midi(
            Some(prev),
            &chord,
            &scale,
            TREBLE_REGISTER,
            strong,
            medium,
            Difficulty::Medium,
            1,
            &mut rng,
        );
        assert!(TREBLE_REGISTER.contains(m));
        let pc = m % 12;
        if strong {
            assert!(chord.contains(&pc), "strong beat {m} off-chord");
        } else {
            assert!(scale.contains(&pc) || chord.contains(&pc));
        }
        prev = m;
    }
}
