// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! RIFFLE - Pattern-based music sequencing.
//!
//! Riffle compiles declarative rhythm patterns (`"x-x[xx]R_"`) plus note or
//! chord pools into deterministic, replayable streams of timed note events.
//! The same compiled clip can drive live, clock-aligned playback through a
//! channel/session layer, or be rendered offline into a finite event list
//! and written out as a standard MIDI file.
//!
//! The crate is organized around a small pipeline:
//!
//! - [`pattern`] compiles a pattern string into a nested step tree and
//!   assigns per-step durations.
//! - [`theory`] resolves scales, chords, progressions, and arpeggios into
//!   concrete note name lists.
//! - [`engine`] provides the musical clock: a task-queue transport, looping
//!   sequences, and the sound-producer contract.
//! - [`source`] acquires sound producers asynchronously (construction,
//!   context reconciliation, volume/effects post-processing).
//! - [`channel`] binds compiled clips to an acquired producer and exposes
//!   grid-aligned start/stop semantics; [`session`] coordinates channels.
//! - [`clip`] renders a clip offline; [`midi`] encodes the result as bytes.

pub mod channel;
pub mod clip;
pub mod config;
pub mod engine;
pub mod error;
pub mod midi;
pub mod pattern;
pub mod session;
pub mod source;
pub mod theory;

pub use channel::{Channel, ChannelEvent, ChannelId, ChannelParams, PlayedNote};
pub use clip::{render_clip, ClipParams, NoteEvent, NoteInput, SizzleStyle};
pub use config::SessionFile;
pub use engine::{ContextId, SharedTransport, Transport, PPQ};
pub use error::{Error, Result};
pub use pattern::{
    assign_durations, expand_pattern, rendering_duration, total_pattern_duration, PatternElement,
    Step, StepKind,
};
pub use session::{ChannelPattern, PlayParams, Session};
pub use source::{SourceParams, SynthParams};
pub use theory::{
    arp, chord_degrees, chords_by_progression, is_chord, is_note, random_progression, scale, Mode,
};
