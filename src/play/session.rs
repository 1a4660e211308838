use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::matcher::{Mark, Matcher, RunStats, ScrollCmd, Timing};
use crate::gen::piece::{generate_piece, Piece, TargetState};
use crate::gen::GenParams;

/// A raw input event from the device layer. Velocity zero is a release in
/// disguise and is treated as a non-event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputNote {
    pub pitch: u8,
    pub velocity: u8,
}

/// One run over one generated piece: owns the material, the grading state
/// and the progress clock. All mutation funnels through here, so a
/// multi-threaded driver only needs to serialize calls into the session.
#[derive(Debug)]
pub struct Session {
    piece: Piece,
    matcher: Matcher,
    progress_beats: f32,
    bpm: f32,
    running: bool,
    user_paused: bool,
}

impl Session {
    pub fn new(piece: Piece, timing: Timing, bpm: f32) -> Self {
        Self {
            piece,
            matcher: Matcher::new(timing),
            progress_beats: 0.0,
            bpm: bpm.max(1.0),
            running: true,
            user_paused: false,
        }
    }

    pub fn piece(&self) -> &Piece {
        &self.piece
    }

    pub fn progress_beats(&self) -> f32 {
        self.progress_beats
    }

    pub fn stats(&self) -> RunStats {
        self.matcher.stats()
    }

    pub fn tricky_ranked(&self, limit: usize) -> Vec<(u8, u32)> {
        self.matcher.tricky_ranked(limit)
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.user_paused
    }

    pub fn is_finished(&self) -> bool {
        self.piece
            .targets
            .iter()
            .all(|t| t.state == TargetState::Completed)
    }

    /// Advance the clock by elapsed wall time, then check for a timeout at
    /// the advanced progress value. Returns marks for the renderer.
    pub fn advance(&mut self, dt_secs: f32) -> Vec<Mark> {
        if !self.running || self.user_paused {
            return Vec::new();
        }
        self.progress_beats += dt_secs.max(0.0) * self.bpm / 60.0;
        let out = self
            .matcher
            .on_clock_advance(&mut self.piece.targets, self.progress_beats);
        self.apply_scroll(out.scroll);
        out.marks
    }

    /// Apply one input event at the current progress value. Events must be
    /// fed in arrival order; they are never reordered or batched here.
    pub fn input(&mut self, note: InputNote) -> Vec<Mark> {
        if note.velocity == 0 {
            return Vec::new();
        }
        let out =
            self.matcher
                .on_input_note(&mut self.piece.targets, note.pitch, self.progress_beats);
        self.apply_scroll(out.scroll);
        out.marks
    }

    fn apply_scroll(&mut self, cmd: Option<ScrollCmd>) {
        match cmd {
            Some(ScrollCmd::Hold { at_beats }) => {
                self.running = false;
                self.progress_beats = self.progress_beats.min(at_beats);
            }
            Some(ScrollCmd::Resume) => {
                if !self.user_paused {
                    self.running = true;
                }
            }
            None => {}
        }
    }

    /// Freeze the clock only; input is still evaluated under the normal
    /// windowing rules while paused.
    pub fn pause(&mut self) {
        self.user_paused = true;
    }

    pub fn resume(&mut self) {
        self.user_paused = false;
        self.running = true;
    }

    /// Reset grading and the clock, keeping the generated material. All
    /// grading state is cleared before the method returns, so no stale
    /// marks can be observed by a later call.
    pub fn restart(&mut self) {
        self.matcher.reset(&mut self.piece.targets);
        self.progress_beats = 0.0;
        self.running = true;
        self.user_paused = false;
        info!("session restarted");
    }

    /// Discard the material and rebuild from fresh parameters, then reset
    /// exactly as `restart` does.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, params: &GenParams, rng: &mut R) {
        self.piece = generate_piece(params, rng);
        self.restart();
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }
}
