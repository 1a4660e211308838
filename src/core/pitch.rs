use serde::{Deserialize, Serialize};

/// Inclusive midi range for one hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub lo: u8,
    pub hi: u8,
}

/// C4..E6.
pub const TREBLE_REGISTER: Register = Register { lo: 60, hi: 88 };
/// C2..E4, high enough to voice a ninth without leaving the staff.
pub const BASS_REGISTER: Register = Register { lo: 36, hi: 64 };

impl Register {
    pub fn center(&self) -> i32 {
        (self.lo as i32 + self.hi as i32 + 1) / 2
    }

    pub fn contains(&self, midi: u8) -> bool {
        midi >= self.lo && midi <= self.hi
    }

    /// Bring a pitch in range by octave shifts, preserving its pitch class.
    /// A register narrower than an octave can defeat the folding; then the
    /// boundary clamp is an accepted lossy degradation.
    pub fn fold(&self, midi: i32) -> u8 {
        let mut x = midi;
        let mut guard = 0;
        while x < self.lo as i32 && guard < 16 {
            x += 12;
            guard += 1;
        }
        while x > self.hi as i32 && guard < 32 {
            x -= 12;
            guard += 1;
        }
        x.clamp(self.lo as i32, self.hi as i32) as u8
    }
}

/// Midi pitch with the given pitch class nearest to `target`.
pub fn nearest_midi_with_pc(target: i32, pc: u8) -> i32 {
    let pc = pc as i32;
    pc + 12 * ((target - pc) as f32 / 12.0).round() as i32
}

/// Nearest in-register pitch whose class is in `pcs`, testing octave
/// variants around the naive placement so a register fold cannot push the
/// result further than an untried neighbor.
pub fn nearest_midi_in_pcs(target: i32, pcs: &[u8], register: Register) -> u8 {
    let mut best: Option<u8> = None;
    let mut best_dist = i32::MAX;
    for &pc in pcs {
        let m = register.fold(nearest_midi_with_pc(target, pc));
        for candidate in [m as i32, m as i32 - 12, m as i32 + 12] {
            let folded = register.fold(candidate);
            let dist = (folded as i32 - target).abs();
            if dist < best_dist {
                best_dist = dist;
                best = Some(folded);
            }
        }
    }
    best.unwrap_or_else(|| register.fold(target))
}

/// Triad (optionally tetrad) pitch classes for a scale degree, stacked in
/// scale steps: i, i+2, i+4 and i+6 for the seventh.
pub fn chord_pcs_for_degree(degree: u8, scale_pcs: &[u8; 7], seventh: bool) -> Vec<u8> {
    let i = ((degree.max(1) - 1) % 7) as usize;
    let mut pcs = vec![
        scale_pcs[i],
        scale_pcs[(i + 2) % 7],
        scale_pcs[(i + 4) % 7],
    ];
    if seventh {
        pcs.push(scale_pcs[(i + 6) % 7]);
    }
    pcs
}
