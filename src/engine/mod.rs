// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback engine: transport clock, looping sequences, and the
//! sound-producer contract.
//!
//! The engine is deliberately offline-friendly. The [`Transport`] is a pure
//! task queue over a tick position; a caller advances it explicitly (a live
//! audio thread pumping wall-clock ticks, or a test pumping synthetic ones)
//! and scheduled callbacks fire in tick order either way.

pub mod sequence;
pub mod source;
pub mod transport;

pub use sequence::{Sequence, StepFn};
pub use source::{
    Effect, EffectSpec, ExternalOutput, NoiseSynth, Player, ReadySignal, Sampler, SharedBuffer,
    SoundSource, SourceKind, Synth,
};
pub use transport::{SharedTransport, TaskId, Transport};

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// Engine resolution in ticks per quarter note
pub const PPQ: u64 = 192;

/// Identity of an execution context (one audio graph / rendering target).
///
/// Every construction call takes a context explicitly; producers built in a
/// different context than the playback target are recreated during
/// acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh context identity
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// A musical time value.
///
/// Parses the usual spellings: `"4n"` (quarter note, `.` dotted, `t` makes
/// it a triplet as in `"8t"`), `"1m"` (measures of four quarters), `"1:2:0"`
/// (bars:beats:sixteenths), or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpec {
    /// Subdivision of a whole note: `4n` is a quarter, `8n.` a dotted eighth
    Note { value: u32, dotted: bool, triplet: bool },
    /// Whole measures of four quarter notes
    Measures(u32),
    /// Transport position `bars:beats:sixteenths`
    Transport { bars: u32, beats: u32, sixteenths: f64 },
    /// Absolute seconds, converted at the transport tempo
    Seconds(f64),
}

impl TimeSpec {
    /// Length in quarter notes at the given tempo
    pub fn quarters(&self, bpm: f64) -> f64 {
        match *self {
            TimeSpec::Note { value, dotted, triplet } => {
                let mut quarters = 4.0 / value as f64;
                if dotted {
                    quarters *= 1.5;
                }
                if triplet {
                    quarters *= 2.0 / 3.0;
                }
                quarters
            }
            TimeSpec::Measures(m) => m as f64 * 4.0,
            TimeSpec::Transport { bars, beats, sixteenths } => {
                bars as f64 * 4.0 + beats as f64 + sixteenths * 0.25
            }
            TimeSpec::Seconds(s) => s * bpm / 60.0,
        }
    }

    /// Length in transport ticks at the given tempo
    pub fn to_ticks(&self, bpm: f64) -> u64 {
        (self.quarters(bpm) * PPQ as f64).round() as u64
    }

    /// Length in seconds at the given tempo
    pub fn to_seconds(&self, bpm: f64) -> f64 {
        self.quarters(bpm) * 60.0 / bpm
    }
}

impl FromStr for TimeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let err = || Error::InvalidTime(s.to_string());
        let trimmed = s.trim();

        if trimmed.contains(':') {
            let parts: Vec<&str> = trimmed.split(':').collect();
            if parts.len() != 3 {
                return Err(err());
            }
            return Ok(TimeSpec::Transport {
                bars: parts[0].parse().map_err(|_| err())?,
                beats: parts[1].parse().map_err(|_| err())?,
                sixteenths: parts[2].parse().map_err(|_| err())?,
            });
        }

        let (body, dotted) = match trimmed.strip_suffix('.') {
            Some(body) => (body, true),
            None => (trimmed, false),
        };

        if let Some(value) = body.strip_suffix('n') {
            return Ok(TimeSpec::Note {
                value: value.parse().map_err(|_| err())?,
                dotted,
                triplet: false,
            });
        }
        if let Some(value) = body.strip_suffix('t') {
            return Ok(TimeSpec::Note {
                value: value.parse().map_err(|_| err())?,
                dotted,
                triplet: true,
            });
        }
        if let Some(value) = body.strip_suffix('m') {
            return Ok(TimeSpec::Measures(value.parse().map_err(|_| err())?));
        }

        if dotted {
            return Err(err());
        }
        trimmed
            .parse::<f64>()
            .map(TimeSpec::Seconds)
            .map_err(|_| err())
    }
}

/// Parse a time value string; shorthand for `str::parse::<TimeSpec>`
pub fn parse_time(s: &str) -> Result<TimeSpec> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_values() {
        let quarter: TimeSpec = "4n".parse().unwrap();
        assert!((quarter.quarters(120.0) - 1.0).abs() < 1e-9);

        let eighth: TimeSpec = "8n".parse().unwrap();
        assert!((eighth.quarters(120.0) - 0.5).abs() < 1e-9);

        let dotted: TimeSpec = "8n.".parse().unwrap();
        assert!((dotted.quarters(120.0) - 0.75).abs() < 1e-9);

        let triplet: TimeSpec = "8t".parse().unwrap();
        assert!((triplet.quarters(120.0) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_measures() {
        let measure: TimeSpec = "1m".parse().unwrap();
        assert!((measure.quarters(120.0) - 4.0).abs() < 1e-9);
        assert_eq!(measure.to_ticks(120.0), 4 * PPQ);
    }

    #[test]
    fn test_transport_position() {
        let pos: TimeSpec = "4:0:0".parse().unwrap();
        assert!((pos.quarters(120.0) - 16.0).abs() < 1e-9);

        let pos: TimeSpec = "1:2:2".parse().unwrap();
        assert!((pos.quarters(120.0) - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_seconds() {
        let spec: TimeSpec = "2".parse().unwrap();
        // 2 seconds at 120 BPM is four quarters
        assert!((spec.quarters(120.0) - 4.0).abs() < 1e-9);
        assert!((spec.to_seconds(120.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_depend_on_tempo() {
        let measure: TimeSpec = "1m".parse().unwrap();
        assert!((measure.to_seconds(120.0) - 2.0).abs() < 1e-9);
        assert!((measure.to_seconds(60.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!(matches!("4x".parse::<TimeSpec>(), Err(Error::InvalidTime(_))));
        assert!(matches!("1:2".parse::<TimeSpec>(), Err(Error::InvalidTime(_))));
        assert!(matches!("".parse::<TimeSpec>(), Err(Error::InvalidTime(_))));
    }

    #[test]
    fn test_context_ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }
}
