use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::gen::piece::{Target, TargetState};

/// Tolerance around a target's onset, in beats. Tunable configuration, not
/// algorithm constants.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default = "Timing::default_early_window_beats")]
    pub early_window_beats: f32,
    #[serde(default = "Timing::default_late_window_beats")]
    pub late_window_beats: f32,
}

impl Timing {
    fn default_early_window_beats() -> f32 {
        0.18
    }
    fn default_late_window_beats() -> f32 {
        0.12
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            early_window_beats: Self::default_early_window_beats(),
            late_window_beats: Self::default_late_window_beats(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    Correct,
    Mistake,
}

/// Renderer notification: recolor the onset with this id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mark {
    pub target_id: String,
    pub kind: MarkKind,
}

/// What the transport should do after a grading step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollCmd {
    /// Freeze and clamp progress back to this onset until it resolves.
    Hold { at_beats: f32 },
    Resume,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub correct: u32,
    pub mistakes: u32,
}

impl RunStats {
    pub fn accuracy_percent(&self) -> u32 {
        let total = self.correct + self.mistakes;
        if total == 0 {
            0
        } else {
            (self.correct as f32 / total as f32 * 100.0).round() as u32
        }
    }
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub marks: Vec<Mark>,
    pub scroll: Option<ScrollCmd>,
}

/// Grading state machine. Single owner of target mutation, driven through
/// two entry points: the periodic clock advance and asynchronous input
/// notes, both evaluated against the caller's current progress value.
#[derive(Debug)]
pub struct Matcher {
    timing: Timing,
    stats: RunStats,
    tricky: HashMap<u8, u32>,
}

impl Matcher {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            stats: RunStats::default(),
            tricky: HashMap::new(),
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Miss tallies sorted by count descending, truncated for display.
    pub fn tricky_ranked(&self, limit: usize) -> Vec<(u8, u32)> {
        let mut out: Vec<(u8, u32)> = self.tricky.iter().map(|(&m, &c)| (m, c)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out.truncate(limit);
        out
    }

    /// Reset grading for a fresh run over the same material.
    pub fn reset(&mut self, targets: &mut [Target]) {
        for t in targets.iter_mut() {
            t.reset();
        }
        self.stats = RunStats::default();
        self.tricky.clear();
    }

    fn current_index(targets: &[Target]) -> Option<usize> {
        targets.iter().position(|t| t.state != TargetState::Completed)
    }

    /// An input note evaluated at the progress value current at receipt.
    /// Notes earlier than the early window are ignored so the performer
    /// cannot race ahead of the current target.
    pub fn on_input_note(
        &mut self,
        targets: &mut [Target],
        pitch: u8,
        progress_beats: f32,
    ) -> MatchOutcome {
        let mut out = MatchOutcome::default();
        let Some(idx) = Self::current_index(targets) else {
            return out;
        };
        let target = &mut targets[idx];

        if progress_beats < target.offset_beats - self.timing.early_window_beats {
            return out;
        }

        if target.midis.contains(&pitch) {
            target.hits.insert(pitch);
            if target.all_hit() {
                target.mistake_flagged = false;
                target.state = TargetState::Completed;
                self.stats.correct += 1;
                debug!(id = %target.id, pitch, "target completed");
                out.marks.push(Mark {
                    target_id: target.id.clone(),
                    kind: MarkKind::Correct,
                });
                out.scroll = Some(ScrollCmd::Resume);
            }
        } else {
            self.flag_mistake(target, pitch, &mut out);
        }
        out
    }

    /// Clock-driven timeout check, run with the progress value advanced in
    /// the same tick. A target already waiting is never re-flagged, so the
    /// backward clamp cannot double-count a stalled performer.
    pub fn on_clock_advance(&mut self, targets: &mut [Target], progress_beats: f32) -> MatchOutcome {
        let mut out = MatchOutcome::default();
        let Some(idx) = Self::current_index(targets) else {
            return out;
        };
        let target = &mut targets[idx];

        if target.state == TargetState::Pending
            && progress_beats >= target.offset_beats + self.timing.late_window_beats
            && !target.all_hit()
        {
            target.state = TargetState::Waiting;
            let missing = target.first_unstruck().unwrap_or_else(|| target.midis[0]);
            self.flag_mistake(target, missing, &mut out);
        }
        out
    }

    fn flag_mistake(&mut self, target: &mut Target, pitch: u8, out: &mut MatchOutcome) {
        if !target.mistake_flagged {
            target.mistake_flagged = true;
            self.stats.mistakes += 1;
        }
        *self.tricky.entry(pitch).or_insert(0) += 1;
        debug!(id = %target.id, pitch, "mistake");
        out.marks.push(Mark {
            target_id: target.id.clone(),
            kind: MarkKind::Mistake,
        });
        out.scroll = Some(ScrollCmd::Hold {
            at_beats: target.offset_beats,
        });
    }
}
