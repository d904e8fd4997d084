// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Arpeggiation.
//!
//! Expands a sequence of chords into single notes. Each chord contributes
//! `count` notes, picked by an `order` string of digits: digit `d` selects
//! chord tone `d mod n` raised by `d / n` octaves, so orders can climb past
//! the chord's own register (`7` on a triad is the root two octaves up).

use crate::error::{Error, Result};
use crate::theory::{chord::chord, is_note, raise_octave};

/// Chord input for [`arp`]: a chord-name string or pre-resolved note lists
#[derive(Debug, Clone)]
pub enum ArpChords {
    /// Space-separated chord names, e.g. `"CM_4 FM_4"`
    Names(String),
    /// One note-name list per chord
    Notes(Vec<Vec<String>>),
}

/// Parameters for [`arp`]
#[derive(Debug, Clone)]
pub struct ArpParams {
    /// Chords to arpeggiate
    pub chords: ArpChords,
    /// Notes generated per chord, 2 to 8
    pub count: usize,
    /// Digit string picking chord tones; defaults to ascending `"0123..."`
    /// truncated to `count`
    pub order: Option<String>,
}

impl From<&str> for ArpParams {
    fn from(chords: &str) -> Self {
        ArpParams {
            chords: ArpChords::Names(chords.to_string()),
            count: 4,
            order: None,
        }
    }
}

/// Resolve the chord input into note lists
fn resolve_chords(chords: &ArpChords) -> Result<Vec<Vec<String>>> {
    match chords {
        ArpChords::Names(names) => names
            .split_whitespace()
            .map(|name| {
                if is_note(name) {
                    Ok(vec![name.to_string()])
                } else {
                    chord(name)
                }
            })
            .collect(),
        ArpChords::Notes(lists) => {
            for list in lists {
                for note in list {
                    if !is_note(note) {
                        return Err(Error::InvalidNote(note.clone()));
                    }
                }
            }
            Ok(lists.clone())
        }
    }
}

/// Arpeggiate chords into a flat note list.
///
/// `arp("CM_4 FM_4")` uses the defaults (count 4, ascending order) and
/// yields `C4 E4 G4 C5 F4 A4 C5 F5`.
pub fn arp(params: impl Into<ArpParams>) -> Result<Vec<String>> {
    let params = params.into();
    if params.count < 2 || params.count > 8 {
        return Err(Error::InvalidArpCount);
    }
    let order = match &params.order {
        Some(order) => {
            if order.is_empty() || !order.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidArpOrder);
            }
            order.clone()
        }
        None => "01234567"[..params.count].to_string(),
    };

    let chords = resolve_chords(&params.chords)?;
    let mut notes = Vec::with_capacity(chords.len() * order.len());
    for tones in &chords {
        let n = tones.len().max(1);
        for digit in order.chars() {
            let d = digit.to_digit(10).expect("validated above") as usize;
            notes.push(raise_octave(&tones[d % n], (d / n) as i32)?);
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let notes = arp("CM_4 FM_4").unwrap();
        assert_eq!(notes[0], "C4");
        assert_eq!(notes[3], "C5");
        assert_eq!(notes[7], "F5");
        assert_eq!(notes.len(), 8);
    }

    #[test]
    fn test_descending_order() {
        let notes = arp(ArpParams {
            chords: ArpChords::Names("CM_4 FM_4".to_string()),
            order: Some("76543210".to_string()),
            count: 8,
        })
        .unwrap();
        assert_eq!(notes[0], "E6");
    }

    #[test]
    fn test_order_derived_from_count() {
        let notes = arp(ArpParams {
            chords: ArpChords::Names("Cmaj7_4 Fmaj7_4".to_string()),
            count: 8,
            order: None,
        })
        .unwrap();
        assert_eq!(notes[0], "C4");
        assert_eq!(notes[15], "E6");
    }

    #[test]
    fn test_chords_as_note_lists() {
        let notes = arp(ArpParams {
            chords: ArpChords::Notes(vec![
                vec!["C3".into(), "E3".into(), "G3".into(), "B3".into()],
                vec!["F3".into(), "A3".into(), "C4".into(), "E4".into()],
            ]),
            count: 8,
            order: None,
        })
        .unwrap();
        assert_eq!(notes[0], "C3");
        assert_eq!(notes[15], "E5");
    }

    #[test]
    fn test_count_validated() {
        for count in [1, 9] {
            assert!(matches!(
                arp(ArpParams {
                    chords: ArpChords::Names("CM_4".to_string()),
                    count,
                    order: None,
                })
                .unwrap_err(),
                Error::InvalidArpCount
            ));
        }
    }

    #[test]
    fn test_order_validated() {
        assert!(matches!(
            arp(ArpParams {
                chords: ArpChords::Names("CM_4".to_string()),
                count: 4,
                order: Some("abc0".to_string()),
            })
            .unwrap_err(),
            Error::InvalidArpOrder
        ));
    }

    #[test]
    fn test_unknown_chord_rejected() {
        assert!(matches!(
            arp("INVALID_CHORD").unwrap_err(),
            Error::UnknownChord(_)
        ));
    }

    #[test]
    fn test_length_scales_with_chord_count() {
        assert_eq!(arp("CM_4").unwrap().len(), 4);
        assert_eq!(arp("CM_4 FM_4").unwrap().len(), 8);
    }
}
