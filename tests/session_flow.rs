use rand::rngs::SmallRng;
use rand::SeedableRng;

use sightline::gen::piece::generate_piece;
use sightline::gen::{Difficulty, GenParams};
use sightline::play::matcher::Timing;
use sightline::play::session::{InputNote, Session};

fn small_piece(seed: u64) -> sightline::gen::piece::Piece {
    let params = GenParams {
        difficulty: Difficulty::Easy,
        target_count: 6,
        ..GenParams::default()
    };
    generate_piece(&params, &mut SmallRng::seed_from_u64(seed))
}

fn play(note: u8) -> InputNote {
    InputNote {
        pitch: note,
        velocity: 80,
    }
}

#[test]
fn perfect_run_finishes_with_full_accuracy() {
    // bpm 60 makes one second of wall time one beat, so advance() deltas
    // read directly as beats.
    let mut session = Session::new(small_piece(1), Timing::default(), 60.0);

    let mut next = 0usize;
    for _ in 0..10_000 {
        if session.is_finished() {
            break;
        }
        let due: Vec<u8> = {
            let targets = &session.piece().targets;
            if next < targets.len() && session.progress_beats() >= targets[next].offset_beats {
                next += 1;
                targets[next - 1].midis.clone()
            } else {
                Vec::new()
            }
        };
        for pitch in due {
            session.input(play(pitch));
        }
        session.advance(0.02);
    }

    assert!(session.is_finished());
    let stats = session.stats();
    assert_eq!(stats.correct as usize, session.piece().targets.len());
    assert_eq!(stats.mistakes, 0);
    assert_eq!(stats.accuracy_percent(), 100);
}

#[test]
fn wrong_note_holds_the_scroll_until_resolved() {
    let mut session = Session::new(small_piece(2), Timing::default(), 60.0);
    let first = session.piece().targets[0].clone();

    // Run the clock a little past the first onset, then fumble.
    while session.progress_beats() < first.offset_beats + 0.05 {
        session.advance(0.01);
    }
    let wrong = first.midis.iter().max().unwrap() + 1;
    session.input(play(wrong));

    assert!(!session.is_running());
    assert!(session.progress_beats() <= first.offset_beats);
    let held_at = session.progress_beats();
    session.advance(0.5);
    assert_eq!(session.progress_beats(), held_at, "held scroll must not move");

    for pitch in &first.midis {
        session.input(play(*pitch));
    }
    assert!(session.is_running());
    assert_eq!(session.stats().mistakes, 1);
    assert_eq!(session.stats().correct, 1);
}

#[test]
fn stalling_counts_one_miss_then_waits() {
    let mut session = Session::new(small_piece(3), Timing::default(), 60.0);
    let first_offset = session.piece().targets[0].offset_beats;

    for _ in 0..200 {
        session.advance(0.02);
    }
    assert!(!session.is_running());
    assert!(session.progress_beats() <= first_offset + 0.2);
    assert_eq!(session.stats().mistakes, 1);
}

#[test]
fn pause_freezes_the_clock_and_resume_releases_it() {
    let mut session = Session::new(small_piece(4), Timing::default(), 60.0);
    session.advance(0.05);
    let at = session.progress_beats();

    session.pause();
    assert!(!session.is_running());
    session.advance(1.0);
    assert_eq!(session.progress_beats(), at);

    session.resume();
    session.advance(0.05);
    assert!(session.progress_beats() > at);
}

#[test]
fn restart_rewinds_without_regenerating() {
    let mut session = Session::new(small_piece(5), Timing::default(), 60.0);
    let first = session.piece().targets[0].clone();
    for pitch in &first.midis {
        session.input(play(*pitch));
    }
    session.advance(0.1);
    assert_eq!(session.stats().correct, 1);

    session.restart();
    assert_eq!(session.progress_beats(), 0.0);
    assert_eq!(session.stats().correct, 0);
    assert_eq!(session.stats().mistakes, 0);
    assert!(session.is_running());
    // Same material, fresh grading.
    assert_eq!(session.piece().targets[0].midis, first.midis);
    assert!(session.piece().targets[0].hits.is_empty());
}

#[test]
fn regenerate_builds_new_material_and_rewinds() {
    let mut session = Session::new(small_piece(6), Timing::default(), 60.0);
    session.advance(0.5);

    let params = GenParams {
        difficulty: Difficulty::Hard,
        target_count: 9,
        ..GenParams::default()
    };
    let mut rng = SmallRng::seed_from_u64(7);
    session.regenerate(&params, &mut rng);
    assert_eq!(session.piece().targets.len(), 9);
    assert_eq!(session.progress_beats(), 0.0);
    assert!(session.is_running());
}

#[test]
fn zero_velocity_input_is_ignored() {
    let mut session = Session::new(small_piece(8), Timing::default(), 60.0);
    let pitch = session.piece().targets[0].midis[0];
    let marks = session.input(InputNote { pitch, velocity: 0 });
    assert!(marks.is_empty());
    assert!(session.piece().targets[0].hits.is_empty());
}
