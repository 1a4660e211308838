use std::collections::BTreeSet;

use sightline::gen::piece::{Target, TargetState};
use sightline::play::matcher::{MarkKind, Matcher, ScrollCmd, Timing};

fn target(start_tick: u64, midis: &[u8]) -> Target {
    Target {
        id: format!("t-{start_tick}"),
        start_tick,
        offset_beats: start_tick as f32 * 0.25,
        midis: midis.to_vec(),
        hits: BTreeSet::new(),
        mistake_flagged: false,
        state: TargetState::Pending,
    }
}

#[test]
fn clean_hit_completes_and_resumes() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[60]), target(4, &[64])];

    let out = m.on_input_note(&mut targets, 60, 0.0);
    assert_eq!(out.marks.len(), 1);
    assert_eq!(out.marks[0].kind, MarkKind::Correct);
    assert_eq!(out.scroll, Some(ScrollCmd::Resume));
    assert_eq!(targets[0].state, TargetState::Completed);
    assert_eq!(m.stats().correct, 1);
    assert_eq!(m.stats().mistakes, 0);
}

#[test]
fn chord_completes_only_when_every_pitch_lands() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[48, 60, 64])];

    assert!(m.on_input_note(&mut targets, 60, 0.0).marks.is_empty());
    assert!(m.on_input_note(&mut targets, 48, 0.0).marks.is_empty());
    assert_eq!(targets[0].state, TargetState::Pending);

    let out = m.on_input_note(&mut targets, 64, 0.0);
    assert_eq!(out.marks[0].kind, MarkKind::Correct);
    assert_eq!(targets[0].state, TargetState::Completed);
    assert_eq!(m.stats().correct, 1);
}

#[test]
fn wrong_notes_count_once_per_target() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[60])];

    let out = m.on_input_note(&mut targets, 61, 0.0);
    assert_eq!(out.marks[0].kind, MarkKind::Mistake);
    assert_eq!(out.scroll, Some(ScrollCmd::Hold { at_beats: 0.0 }));
    assert_eq!(m.stats().mistakes, 1);

    // A second fumble on the same target is marked but not re-counted.
    let out = m.on_input_note(&mut targets, 62, 0.0);
    assert_eq!(out.marks[0].kind, MarkKind::Mistake);
    assert_eq!(m.stats().mistakes, 1);

    let out = m.on_input_note(&mut targets, 60, 0.0);
    assert_eq!(out.marks[0].kind, MarkKind::Correct);
    assert_eq!(m.stats().correct, 1);
    assert_eq!(m.stats().accuracy_percent(), 50);
    assert_eq!(m.tricky_ranked(8), vec![(61, 1), (62, 1)]);
}

#[test]
fn early_notes_are_ignored() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(8, &[60])];

    // Onset is at 2.0 beats; 1.5 is well before the early window.
    let out = m.on_input_note(&mut targets, 60, 1.5);
    assert!(out.marks.is_empty());
    assert!(out.scroll.is_none());
    assert_eq!(targets[0].state, TargetState::Pending);
    assert!(targets[0].hits.is_empty());

    // Inside the window it lands.
    let out = m.on_input_note(&mut targets, 60, 2.0 - 0.1);
    assert_eq!(out.marks[0].kind, MarkKind::Correct);
}

#[test]
fn timeout_flags_once_and_holds_at_the_onset() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(8, &[60, 64])];

    assert!(m.on_clock_advance(&mut targets, 2.0).marks.is_empty());

    let out = m.on_clock_advance(&mut targets, 2.2);
    assert_eq!(out.marks[0].kind, MarkKind::Mistake);
    assert_eq!(out.scroll, Some(ScrollCmd::Hold { at_beats: 2.0 }));
    assert_eq!(targets[0].state, TargetState::Waiting);
    assert_eq!(m.stats().mistakes, 1);

    // Waiting targets are never re-flagged by later ticks.
    for _ in 0..10 {
        assert!(m.on_clock_advance(&mut targets, 2.2).marks.is_empty());
    }
    assert_eq!(m.stats().mistakes, 1);

    // The missing first pitch is what gets tallied.
    assert_eq!(m.tricky_ranked(1), vec![(60, 1)]);

    m.on_input_note(&mut targets, 60, 2.0);
    let out = m.on_input_note(&mut targets, 64, 2.0);
    assert_eq!(out.scroll, Some(ScrollCmd::Resume));
    assert_eq!(targets[0].state, TargetState::Completed);
}

#[test]
fn input_after_the_last_target_is_a_no_op() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[60])];
    m.on_input_note(&mut targets, 60, 0.0);

    let out = m.on_input_note(&mut targets, 61, 1.0);
    assert!(out.marks.is_empty());
    assert!(m.on_clock_advance(&mut targets, 5.0).marks.is_empty());
    assert_eq!(m.stats().mistakes, 0);
}

#[test]
fn reset_clears_grading_but_keeps_pitches() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[60]), target(4, &[62])];
    m.on_input_note(&mut targets, 59, 0.0);
    m.on_input_note(&mut targets, 60, 0.0);

    m.reset(&mut targets);
    assert_eq!(m.stats().correct, 0);
    assert_eq!(m.stats().mistakes, 0);
    assert!(m.tricky_ranked(8).is_empty());
    for t in &targets {
        assert_eq!(t.state, TargetState::Pending);
        assert!(t.hits.is_empty());
        assert!(!t.mistake_flagged);
        assert!(!t.midis.is_empty());
    }
}

#[test]
fn tricky_ranking_sorts_by_count_then_pitch() {
    let mut m = Matcher::new(Timing::default());
    let mut targets = vec![target(0, &[60])];
    m.on_input_note(&mut targets, 61, 0.0);
    m.on_input_note(&mut targets, 61, 0.0);
    m.on_input_note(&mut targets, 59, 0.0);
    assert_eq!(m.tricky_ranked(8), vec![(61, 2), (59, 1)]);
    assert_eq!(m.tricky_ranked(1), vec![(61, 2)]);
}
