// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Roman-numeral progressions.
//!
//! A progression is a space-separated string of Roman numerals with optional
//! modifiers: `7` for a seventh, `°` for half-diminished, `+` for a raised
//! fifth. Uppercase numerals resolve to major qualities, lowercase to minor.
//! Resolution against a scale spec produces chord names consumable by
//! [`crate::theory::chord`].

use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::theory::scale::scale;

/// Diatonic chord degrees per mode. Case encodes the triad quality at each
/// degree; `°` marks the diminished degree and `+` the augmented one.
fn mode_degrees(mode: &str) -> &'static [&'static str] {
    let normalized = mode.trim().to_lowercase().replace([' ', '-', '_'], "");
    match normalized.as_str() {
        "major" | "ionian" => &["I", "ii", "iii", "IV", "V", "vi", "vii°"],
        "dorian" => &["i", "ii", "III", "IV", "v", "vi°", "VII"],
        "phrygian" => &["i", "II", "III", "iv", "v°", "VI", "vii"],
        "lydian" => &["I", "II", "iii", "iv°", "V", "vi", "vii"],
        "mixolydian" => &["I", "ii", "iii°", "IV", "v", "vi", "VII"],
        "minor" | "aeolian" => &["i", "ii°", "III", "iv", "v", "VI", "VII"],
        "locrian" => &["i°", "II", "iii", "iv", "V", "VI", "vii"],
        "melodicminor" => &["i", "ii", "III+", "IV", "V", "vi°", "vii°"],
        "harmonicminor" => &["i", "ii°", "III+", "iv", "V", "VI", "vii°"],
        _ => &[],
    }
}

/// Diatonic chord degrees of a mode, e.g. `chord_degrees("ionian")` is
/// `["I", "ii", "iii", "IV", "V", "vi", "vii°"]`. Unknown modes yield an
/// empty list rather than an error so callers can probe.
pub fn chord_degrees(mode: &str) -> Vec<String> {
    mode_degrees(mode).iter().map(|s| s.to_string()).collect()
}

/// 0-based scale index for a Roman numeral base (modifiers stripped)
fn degree_index(base: &str) -> Option<usize> {
    match base.to_lowercase().as_str() {
        "i" => Some(0),
        "ii" => Some(1),
        "iii" => Some(2),
        "iv" => Some(3),
        "v" => Some(4),
        "vi" => Some(5),
        "vii" => Some(6),
        _ => None,
    }
}

/// Resolve one numeral token against resolved scale notes into a chord name
fn degree_to_chord(token: &str, scale_notes: &[String]) -> Result<String> {
    let err = || Error::InvalidDegree(token.to_string());

    let base: String = token.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let index = degree_index(&base).ok_or_else(err)?;
    let is_major = base.chars().next().is_some_and(|c| c.is_ascii_uppercase());

    let mut quality = if token.contains('7') {
        if is_major { "maj7" } else { "m7" }.to_string()
    } else if is_major {
        "M".to_string()
    } else {
        "m".to_string()
    };
    if token.contains('°') {
        quality = format!("{}7b5", if is_major { "M" } else { "m" });
    }
    if token.contains('+') {
        quality = format!("{}#5", if is_major { "M" } else { "m" });
    }

    // The scale note carries the octave: "D#4" splits into root and octave.
    let note = scale_notes.get(index).ok_or_else(err)?;
    let octave = &note[note.len() - 1..];
    let root = &note[..note.len() - 1];
    Ok(format!("{}{}_{}", root, quality, octave))
}

/// Resolve a progression against a scale spec into a space-separated chord
/// name string: `chords_by_progression("C4 major", "I IV V ii")` is
/// `"CM_4 FM_4 GM_4 Dm_4"`.
pub fn chords_by_progression(scale_spec: &str, degrees: &str) -> Result<String> {
    let notes = scale(scale_spec)?;
    let chords: Result<Vec<String>> = degrees
        .split_whitespace()
        .map(|token| degree_to_chord(token, &notes))
        .collect();
    Ok(chords?.join(" "))
}

/// Generate a random tonic-predominant-dominant progression of `count`
/// numerals for `"major"`/`"M"` or `"minor"`/`"m"`. The first numeral is
/// always drawn from the tonic pool. Unknown scale types yield an empty list.
pub fn random_progression(scale_type: &str, count: usize) -> Vec<String> {
    let (tonic, predominant, dominant): (&[&str], &[&str], &[&str]) = match scale_type {
        "major" | "M" => (&["I", "vi"], &["ii", "IV"], &["V"]),
        "minor" | "m" => (&["i", "VI"], &["ii°", "iv"], &["V"]),
        _ => return Vec::new(),
    };

    let mut rng = rand::thread_rng();
    let pools = [tonic, predominant, dominant];
    (0..count)
        .map(|i| {
            let pool = if i == 0 { tonic } else { pools[i % pools.len()] };
            pool.choose(&mut rng).unwrap_or(&pool[0]).to_string()
        })
        .collect()
}
