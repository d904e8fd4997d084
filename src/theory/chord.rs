// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord name resolution.
//!
//! A chord name is a root, a quality, and an optional octave separated by an
//! underscore: `CM_4`, `Dm7_3`, `F#m7b5_5`. The octave defaults to 4. The
//! quality selects a semitone formula applied to the root.

use crate::error::{Error, Result};
use crate::theory::{is_note, midi_to_name, parse_root};

/// Semitone formulas by quality, checked in order. Longer names come first
/// so that `maj7` is not swallowed by a shorter prefix.
const FORMULAS: &[(&str, &[i32])] = &[
    ("maj7", &[0, 4, 7, 11]),
    ("m7b5", &[0, 3, 6, 10]),
    ("M7b5", &[0, 4, 6, 11]),
    ("M#5", &[0, 4, 8]),
    ("m#5", &[0, 3, 8]),
    ("sus2", &[0, 2, 7]),
    ("sus4", &[0, 5, 7]),
    ("dim", &[0, 3, 6]),
    ("m7", &[0, 3, 7, 10]),
    ("M", &[0, 4, 7]),
    ("m", &[0, 3, 7]),
    ("7", &[0, 4, 7, 10]),
];

fn formula(quality: &str) -> Option<&'static [i32]> {
    FORMULAS
        .iter()
        .find(|(name, _)| *name == quality)
        .map(|(_, semitones)| *semitones)
}

/// Check whether a string names a resolvable chord (and is not a plain note)
pub fn is_chord(s: &str) -> bool {
    !is_note(s) && chord(s).is_ok()
}

/// Resolve a chord name into its note names: `chord("CM_4")` is
/// `["C4", "E4", "G4"]`. The `_octave` suffix is optional and defaults to 4.
pub fn chord(name: &str) -> Result<Vec<String>> {
    let err = || Error::UnknownChord(name.to_string());

    let (head, octave) = match name.split_once('_') {
        Some((head, octave_str)) => {
            let octave: i32 = octave_str.parse().map_err(|_| err())?;
            (head, octave)
        }
        None => (name, 4),
    };

    // Root is the leading letter plus an optional accidental; the rest is
    // the quality.
    let mut root_len = 1;
    let mut chars = head.chars();
    let letter = chars.next().ok_or_else(err)?;
    if !matches!(letter.to_ascii_uppercase(), 'A'..='G') {
        return Err(err());
    }
    if matches!(chars.next(), Some('#') | Some('b')) {
        root_len += 1;
    }
    let root = parse_root(&head[..root_len]).map_err(|_| err())?;
    let quality = &head[root_len..];
    let quality = if quality.is_empty() { "M" } else { quality };
    let semitones = formula(quality).ok_or_else(err)?;

    let base = (octave + 1) * 12 + root;
    Ok(semitones.iter().map(|&s| midi_to_name(base + s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_triad() {
        assert_eq!(chord("CM_4").unwrap(), vec!["C4", "E4", "G4"]);
    }

    #[test]
    fn test_minor_triad_with_accidental() {
        assert_eq!(chord("F#m_3").unwrap(), vec!["F#3", "A3", "C#4"]);
    }

    #[test]
    fn test_sevenths() {
        assert_eq!(chord("Cmaj7_4").unwrap(), vec!["C4", "E4", "G4", "B4"]);
        assert_eq!(chord("Dm7_4").unwrap(), vec!["D4", "F4", "A4", "C5"]);
        assert_eq!(chord("Dm7b5_4").unwrap(), vec!["D4", "F4", "G#4", "C5"]);
    }

    #[test]
    fn test_octave_defaults_to_four() {
        assert_eq!(chord("CM").unwrap(), chord("CM_4").unwrap());
    }

    #[test]
    fn test_bare_root_is_major() {
        assert_eq!(chord("C").unwrap(), chord("CM").unwrap());
    }

    #[test]
    fn test_unknown_quality_rejected() {
        let err = chord("Cxyz_4").unwrap_err();
        assert!(matches!(err, Error::UnknownChord(_)));
        assert!(err.to_string().contains("Cxyz_4"));
    }

    #[test]
    fn test_is_chord() {
        assert!(is_chord("CM"));
        assert!(is_chord("F#m7b5_5"));
        assert!(!is_chord("C4"));
        assert!(!is_chord("xyz"));
    }
}
