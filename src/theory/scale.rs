// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scale and mode resolution.
//!
//! A scale spec is a root note (with optional octave, default 4) followed by
//! a mode name, e.g. `"C4 major"` or `"a harmonic minor"`. Resolution returns
//! the seven concrete note names of one scale octave.

use std::fmt;

use crate::error::{Error, Result};
use crate::theory::{midi_to_name, note_to_midi, parse_root};

/// The seven diatonic modes plus the two altered minor scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
}

impl Mode {
    /// Intervals in semitones from the root
    pub fn intervals(self) -> [i32; 7] {
        match self {
            Mode::Ionian => [0, 2, 4, 5, 7, 9, 11],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Aeolian => [0, 2, 3, 5, 7, 8, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
            Mode::HarmonicMinor => [0, 2, 3, 5, 7, 8, 11],
            Mode::MelodicMinor => [0, 2, 3, 5, 7, 9, 11],
        }
    }

    /// Parse a mode name; `major`/`minor` alias ionian/aeolian
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace([' ', '-', '_'], "");
        match s.as_str() {
            "major" | "ionian" => Some(Mode::Ionian),
            "dorian" => Some(Mode::Dorian),
            "phrygian" => Some(Mode::Phrygian),
            "lydian" => Some(Mode::Lydian),
            "mixolydian" => Some(Mode::Mixolydian),
            "minor" | "naturalminor" | "aeolian" => Some(Mode::Aeolian),
            "locrian" => Some(Mode::Locrian),
            "harmonicminor" => Some(Mode::HarmonicMinor),
            "melodicminor" => Some(Mode::MelodicMinor),
            _ => None,
        }
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Mode::Ionian => "ionian",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Aeolian => "aeolian",
            Mode::Locrian => "locrian",
            Mode::HarmonicMinor => "harmonic minor",
            Mode::MelodicMinor => "melodic minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Split a scale spec into its root MIDI note and mode.
/// The root token may omit the octave, which then defaults to 4.
pub(crate) fn parse_scale_spec(spec: &str) -> Result<(i32, Mode)> {
    let mut tokens = spec.split_whitespace();
    let root_token = tokens.next().ok_or_else(|| Error::UnknownMode(spec.to_string()))?;
    let mode_name: String = tokens.collect::<Vec<_>>().join(" ");
    let mode = Mode::from_name(&mode_name).ok_or_else(|| Error::UnknownMode(spec.to_string()))?;

    let root_midi = if root_token.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        note_to_midi(root_token)?
    } else {
        (4 + 1) * 12 + parse_root(root_token)?
    };
    Ok((root_midi, mode))
}

/// Resolve a scale spec like `"C4 major"` into its note names:
/// `["C4", "D4", "E4", "F4", "G4", "A4", "B4"]`.
pub fn scale(spec: &str) -> Result<Vec<String>> {
    let (root, mode) = parse_scale_spec(spec)?;
    Ok(mode
        .intervals()
        .iter()
        .map(|&i| midi_to_name(root + i))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major() {
        assert_eq!(
            scale("C4 major").unwrap(),
            vec!["C4", "D4", "E4", "F4", "G4", "A4", "B4"]
        );
    }

    #[test]
    fn test_minor_aliases_aeolian() {
        assert_eq!(scale("A3 minor").unwrap(), scale("A3 aeolian").unwrap());
        assert_eq!(
            scale("A3 minor").unwrap(),
            vec!["A3", "B3", "C4", "D4", "E4", "F4", "G4"]
        );
    }

    #[test]
    fn test_octave_defaults_to_four() {
        assert_eq!(scale("D minor").unwrap(), scale("D4 minor").unwrap());
    }

    #[test]
    fn test_sharps_in_output() {
        assert_eq!(
            scale("E4 major").unwrap(),
            vec!["E4", "F#4", "G#4", "A4", "B4", "C#5", "D#5"]
        );
    }

    #[test]
    fn test_harmonic_minor_raised_seventh() {
        let notes = scale("A3 harmonic minor").unwrap();
        assert_eq!(notes[6], "G#4");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(matches!(
            scale("C4 superphrygian").unwrap_err(),
            Error::UnknownMode(_)
        ));
    }
}
