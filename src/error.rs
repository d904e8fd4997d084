// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for pattern compilation, resolution, acquisition, and playback.
//!
//! Validation and resolution errors are synchronous and fatal to the call
//! that raised them. Acquisition errors are delivered through a channel's
//! event observer and leave the channel permanently failed. Trigger errors
//! are isolated per event and never interrupt playback.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    /// Pattern string contains a character outside the `x - _ [ ] R` alphabet
    #[error("pattern can only comprise x - _ [ ] R, found {0}")]
    InvalidPattern(String),

    /// Pattern string is empty
    #[error("no pattern provided")]
    EmptyPattern,

    /// Pattern string has unbalanced brackets
    #[error("unbalanced brackets in pattern {0}")]
    UnbalancedPattern(String),

    /// Pattern has no `x`/`R` steps where at least one is required
    #[error("pattern {0} contains no trigger steps")]
    NoTriggerSteps(String),

    /// Time value string could not be parsed
    #[error("invalid time value {0}")]
    InvalidTime(String),

    /// No sound source alternative was supplied
    #[error("one of synth|instrument|sample|sampler|samples|player|external must be provided")]
    MissingSource,

    /// More than one sound source alternative was supplied
    #[error("conflicting sound sources: {0}")]
    ConflictingSources(String),

    /// Effects were requested together with an external output delegate
    #[error("effects cannot be used with an external output")]
    EffectsWithExternal,

    /// Chord name could not be resolved to notes
    #[error("chord {0} not found")]
    UnknownChord(String),

    /// Scale or mode name is not recognized
    #[error("unknown scale or mode {0}")]
    UnknownMode(String),

    /// Note list contained something that is not a valid note name
    #[error("note list must comprise valid notes, found {0}")]
    InvalidNote(String),

    /// Roman numeral in a progression could not be parsed
    #[error("invalid progression degree {0}")]
    InvalidDegree(String),

    /// Arpeggio note count outside the supported 2..=8 range
    #[error("invalid value for count")]
    InvalidArpCount,

    /// Arpeggio order string contains non-digit characters
    #[error("invalid value for order")]
    InvalidArpOrder,

    /// An error raised while registering a clip, annotated with its 1-based
    /// position in the channel
    #[error("{source} in clip {position}")]
    Clip {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    /// Sound-source acquisition failed; terminal for the owning channel
    #[error("{message} in channel {channel_idx} ({channel_name})")]
    Acquisition {
        channel_idx: String,
        channel_name: String,
        message: String,
    },

    /// A single note trigger failed; playback continues
    #[error("trigger failed: {0}")]
    Trigger(String),
}

impl Error {
    /// Wrap an error with the 1-based clip position it occurred in
    pub fn in_clip(self, position: usize) -> Self {
        Error::Clip {
            position,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_annotation() {
        let err = Error::InvalidPattern("xyz".into()).in_clip(2);
        let msg = err.to_string();
        assert!(msg.contains("in clip 2"));
        assert!(msg.contains("xyz"));
    }

    #[test]
    fn test_acquisition_names_channel() {
        let err = Error::Acquisition {
            channel_idx: "3".into(),
            channel_name: "bass".into(),
            message: "sample fetch rejected".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3"));
        assert!(msg.contains("bass"));
    }
}
