// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music theory resolver.
//!
//! Converts root+mode+interval specifications into concrete note name lists:
//! scales, chord names, Roman-numeral progressions, and arpeggios. Everything
//! here is a pure function over note name strings like `"C4"` or `"F#3"`;
//! the playback layers consume the resolved lists and never parse names
//! themselves.

pub mod arp;
pub mod chord;
pub mod progression;
pub mod scale;

pub use arp::{arp, ArpChords, ArpParams};
pub use chord::{chord, is_chord};
pub use progression::{chord_degrees, chords_by_progression, random_progression};
pub use scale::{scale, Mode};

use crate::error::{Error, Result};

/// Chromatic note names, sharps only. Resolved output always uses sharps;
/// flat input is accepted and re-spelled.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Check whether a string is a note name with octave, e.g. `c4` or `F#3`.
/// Chord names like `CM` are not notes.
pub fn is_note(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    match chars.as_slice() {
        [letter, octave] => letter.is_ascii_alphabetic()
            && matches!(letter.to_ascii_uppercase(), 'A'..='G')
            && octave.is_ascii_digit(),
        [letter, accidental, octave] => letter.is_ascii_alphabetic()
            && matches!(letter.to_ascii_uppercase(), 'A'..='G')
            && matches!(accidental, '#' | 'b')
            && octave.is_ascii_digit(),
        _ => false,
    }
}

/// Pitch class (0-11 before accidentals) for a note letter
fn letter_pitch_class(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Parse a pitch-class root like `C`, `f#`, or `Bb` (no octave).
/// Returns the pitch class 0-11.
pub fn parse_root(s: &str) -> Result<i32> {
    let mut chars = s.chars();
    let letter = chars.next().ok_or_else(|| Error::InvalidNote(s.to_string()))?;
    let mut pc = letter_pitch_class(letter).ok_or_else(|| Error::InvalidNote(s.to_string()))?;
    match chars.next() {
        None => {}
        Some('#') => pc += 1,
        Some('b') => pc -= 1,
        Some(_) => return Err(Error::InvalidNote(s.to_string())),
    }
    if chars.next().is_some() {
        return Err(Error::InvalidNote(s.to_string()));
    }
    Ok(pc.rem_euclid(12))
}

/// Parse a note name with octave into a MIDI note number (C4 = 60)
pub fn note_to_midi(name: &str) -> Result<i32> {
    if !is_note(name) {
        return Err(Error::InvalidNote(name.to_string()));
    }
    let octave = name
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| Error::InvalidNote(name.to_string()))? as i32;
    let pc = parse_root(&name[..name.len() - 1])?;
    Ok((octave + 1) * 12 + pc)
}

/// Format a MIDI note number as a sharp-spelled note name (60 = `C4`)
pub fn midi_to_name(midi: i32) -> String {
    let pc = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[pc], octave)
}

/// Raise a note name by whole octaves (`raise_octave("E4", 2)` = `E6`)
pub fn raise_octave(name: &str, octaves: i32) -> Result<String> {
    Ok(midi_to_name(note_to_midi(name)? + 12 * octaves))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_note() {
        assert!(is_note("c4"));
        assert!(is_note("C4"));
        assert!(is_note("F#3"));
        assert!(is_note("Bb2"));
        assert!(!is_note("CM"));
        assert!(!is_note("C"));
        assert!(!is_note("C44"));
        assert!(!is_note("H4"));
    }

    #[test]
    fn test_note_to_midi() {
        assert_eq!(note_to_midi("C4").unwrap(), 60);
        assert_eq!(note_to_midi("A4").unwrap(), 69);
        assert_eq!(note_to_midi("C#4").unwrap(), 61);
        assert_eq!(note_to_midi("Db4").unwrap(), 61);
        assert!(note_to_midi("CM_4").is_err());
    }

    #[test]
    fn test_midi_to_name() {
        assert_eq!(midi_to_name(60), "C4");
        assert_eq!(midi_to_name(61), "C#4");
        assert_eq!(midi_to_name(59), "B3");
    }

    #[test]
    fn test_raise_octave() {
        assert_eq!(raise_octave("E4", 2).unwrap(), "E6");
        assert_eq!(raise_octave("C4", 0).unwrap(), "C4");
    }
}
