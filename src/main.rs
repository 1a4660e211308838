// Entry point: generate a piece, optionally dump it for a renderer or run a
// scripted performance against the grading engine.
use std::collections::VecDeque;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sightline::cli::Args;
use sightline::config::AppConfig;
use sightline::core::key::{note_name, Key};
use sightline::core::timebase::TimeSig;
use sightline::gen::piece::{generate_piece, Piece};
use sightline::gen::{Difficulty, GenParams};
use sightline::play::matcher::Timing;
use sightline::play::session::{InputNote, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config);

    let key: Key = args
        .key
        .as_deref()
        .unwrap_or(&config.generation.key)
        .parse()?;
    let time_sig: TimeSig = args
        .timesig
        .as_deref()
        .unwrap_or(&config.generation.timesig)
        .parse()?;
    let difficulty: Difficulty = args
        .difficulty
        .as_deref()
        .unwrap_or(&config.generation.difficulty)
        .parse()?;
    let params = GenParams {
        key,
        time_sig,
        difficulty,
        max_poly: args.polyphony.unwrap_or(config.generation.max_poly),
        target_count: args.targets.unwrap_or(config.generation.target_count),
    }
    .clamped();
    let bpm = args.bpm.unwrap_or(config.playback.bpm);

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!(seed, %key, %time_sig, %difficulty, "generating");

    let mut rng = SmallRng::seed_from_u64(seed);
    let piece = generate_piece(&params, &mut rng);
    info!(
        measures = piece.measure_count(),
        treble_events = piece.treble.len(),
        bass_events = piece.bass.len(),
        targets = piece.targets.len(),
        "piece ready"
    );

    if let Some(path) = &args.json {
        fs::write(path, serde_json::to_string_pretty(&piece)?)?;
        info!(%path, "piece written");
    }

    if args.simulate {
        run_simulation(piece, config.timing, bpm, args.speed, args.flub, seed);
    }

    Ok(())
}

/// Replay the piece's own targets through the matcher: a producer thread
/// feeds input events over a channel while this thread drives the clock, so
/// the two entry points are exercised from their real boundaries.
fn run_simulation(piece: Piece, timing: Timing, bpm: f32, speed: f32, flub: f32, seed: u64) {
    let prefer_sharps = piece.prefer_sharps;
    let mut session = Session::new(piece, timing, bpm);

    let mut script_rng = SmallRng::seed_from_u64(seed ^ 0x51_6e_7d);
    let mut script: Vec<(f32, InputNote)> = Vec::new();
    for t in &session.piece().targets {
        // Late-only jitter, kept under the late window so a sloppy but
        // honest performance still lands every pitch.
        let jitter = script_rng.random_range(0.0..0.06);
        if flub > 0.0 && script_rng.random_range(0.0..1.0) < flub {
            let wrong = wrong_pitch_for(&t.midis);
            script.push((
                t.offset_beats + jitter * 0.5,
                InputNote {
                    pitch: wrong,
                    velocity: 96,
                },
            ));
        }
        for &pitch in &t.midis {
            script.push((
                t.offset_beats + jitter,
                InputNote {
                    pitch,
                    velocity: 96,
                },
            ));
        }
    }

    let (tx, rx) = crossbeam_channel::unbounded::<(f32, InputNote)>();
    let producer = thread::spawn(move || {
        for ev in script {
            if tx.send(ev).is_err() {
                break;
            }
        }
    });

    let total_beats = session
        .piece()
        .targets
        .last()
        .map(|t| t.offset_beats)
        .unwrap_or(0.0);
    let deadline = Instant::now()
        + Duration::from_secs_f32((total_beats / bpm.max(1.0) * 60.0 / speed.max(0.1)) + 10.0);

    let mut pending: VecDeque<(f32, InputNote)> = VecDeque::new();
    let mut last = Instant::now();
    while !session.is_finished() {
        if Instant::now() > deadline {
            warn!("simulation deadline passed; aborting run");
            break;
        }
        while let Ok(ev) = rx.try_recv() {
            pending.push_back(ev);
        }
        // A held scroll is waiting on the performer, so pending notes are
        // due immediately; otherwise they wait for their scripted beat.
        while pending
            .front()
            .is_some_and(|(beats, _)| !session.is_running() || *beats <= session.progress_beats())
        {
            if let Some((_, note)) = pending.pop_front() {
                session.input(note);
            }
        }
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        session.advance(dt * speed.max(0.1));
        thread::sleep(Duration::from_millis(2));
    }
    let _ = producer.join();

    let stats = session.stats();
    info!(
        correct = stats.correct,
        mistakes = stats.mistakes,
        accuracy = stats.accuracy_percent(),
        "simulation finished"
    );
    for (pitch, count) in session.tricky_ranked(6) {
        info!("tricky: {} - {count} misses", note_name(pitch, prefer_sharps));
    }
}

fn wrong_pitch_for(required: &[u8]) -> u8 {
    let mut candidate = required.first().copied().unwrap_or(60).saturating_add(1);
    while required.contains(&candidate) {
        candidate = candidate.saturating_add(1);
    }
    candidate
}
