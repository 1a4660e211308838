use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
pub const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Major scale steps in semitones from the tonic.
pub const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// The fifteen notated major keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    C,
    G,
    D,
    A,
    E,
    B,
    Fs,
    Cs,
    F,
    Bb,
    Eb,
    Ab,
    Db,
    Gb,
    Cb,
}

impl Key {
    pub const ALL: [Key; 15] = [
        Key::C,
        Key::G,
        Key::D,
        Key::A,
        Key::E,
        Key::B,
        Key::Fs,
        Key::Cs,
        Key::F,
        Key::Bb,
        Key::Eb,
        Key::Ab,
        Key::Db,
        Key::Gb,
        Key::Cb,
    ];

    /// Signed accidental count of the key signature (sharps positive).
    pub fn accidentals(self) -> i8 {
        match self {
            Key::C => 0,
            Key::G => 1,
            Key::D => 2,
            Key::A => 3,
            Key::E => 4,
            Key::B => 5,
            Key::Fs => 6,
            Key::Cs => 7,
            Key::F => -1,
            Key::Bb => -2,
            Key::Eb => -3,
            Key::Ab => -4,
            Key::Db => -5,
            Key::Gb => -6,
            Key::Cb => -7,
        }
    }

    pub fn prefer_sharps(self) -> bool {
        self.accidentals() > 0
    }

    pub fn tonic_pc(self) -> u8 {
        match self {
            Key::C => 0,
            Key::G => 7,
            Key::D => 2,
            Key::A => 9,
            Key::E => 4,
            Key::B | Key::Cb => 11,
            Key::Fs | Key::Gb => 6,
            Key::Cs | Key::Db => 1,
            Key::F => 5,
            Key::Bb => 10,
            Key::Eb => 3,
            Key::Ab => 8,
        }
    }

    /// Pitch classes of the major scale, degree 1..=7 in order.
    pub fn scale_pcs(self) -> [u8; 7] {
        let tonic = self.tonic_pc();
        let mut pcs = [0u8; 7];
        for (i, step) in MAJOR_SCALE.iter().enumerate() {
            pcs[i] = (tonic + step) % 12;
        }
        pcs
    }
}

/// Pitch spelling for logs and the tricky-note display, e.g. `C#4`.
pub fn note_name(midi: u8, prefer_sharps: bool) -> String {
    let octave = midi as i32 / 12 - 1;
    let names = if prefer_sharps {
        &NOTE_NAMES_SHARP
    } else {
        &NOTE_NAMES_FLAT
    };
    format!("{}{}", names[(midi % 12) as usize], octave)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Key::C => "C",
            Key::G => "G",
            Key::D => "D",
            Key::A => "A",
            Key::E => "E",
            Key::B => "B",
            Key::Fs => "F#",
            Key::Cs => "C#",
            Key::F => "F",
            Key::Bb => "Bb",
            Key::Eb => "Eb",
            Key::Ab => "Ab",
            Key::Db => "Db",
            Key::Gb => "Gb",
            Key::Cb => "Cb",
        };
        f.write_str(s)
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Key::C),
            "G" => Ok(Key::G),
            "D" => Ok(Key::D),
            "A" => Ok(Key::A),
            "E" => Ok(Key::E),
            "B" => Ok(Key::B),
            "F#" => Ok(Key::Fs),
            "C#" => Ok(Key::Cs),
            "F" => Ok(Key::F),
            "Bb" => Ok(Key::Bb),
            "Eb" => Ok(Key::Eb),
            "Ab" => Ok(Key::Ab),
            "Db" => Ok(Key::Db),
            "Gb" => Ok(Key::Gb),
            "Cb" => Ok(Key::Cb),
            _ => Err(format!("unknown key: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_pcs_are_in_key() {
        let pcs = Key::G.scale_pcs();
        assert_eq!(pcs, [7, 9, 11, 0, 2, 4, 6]);
    }

    #[test]
    fn enharmonic_keys_share_tonic_pc() {
        assert_eq!(Key::Fs.tonic_pc(), Key::Gb.tonic_pc());
        assert_eq!(Key::Cs.tonic_pc(), Key::Db.tonic_pc());
        assert_eq!(Key::B.tonic_pc(), Key::Cb.tonic_pc());
        assert!(Key::Fs.prefer_sharps());
        assert!(!Key::Gb.prefer_sharps());
    }

    #[test]
    fn display_round_trips() {
        for key in Key::ALL {
            let parsed: Key = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn spelling_matches_preference() {
        assert_eq!(note_name(61, true), "C#4");
        assert_eq!(note_name(61, false), "Db4");
        assert_eq!(note_name(60, true), "C4");
    }
}
