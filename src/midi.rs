// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file encoding for rendered clips.
//!
//! Encodes the event list produced by [`render_clip`](crate::clip::render_clip)
//! as a Type 0 MIDI file on channel 0. Event durations arrive in quarter-note
//! units and are scaled to the file's tick resolution; rests advance the
//! clock without emitting anything.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::clip::NoteEvent;
use crate::error::Result;
use crate::theory::note_to_midi;

/// Ticks per quarter note in encoded files
pub const FILE_PPQ: u16 = 480;

/// One raw event at an absolute tick
struct TrackEvent {
    tick: u64,
    data: Vec<u8>,
}

impl TrackEvent {
    fn note_on(tick: u64, note: u8, velocity: u8) -> Self {
        TrackEvent {
            tick,
            data: vec![0x90, note & 0x7F, velocity & 0x7F],
        }
    }

    fn note_off(tick: u64, note: u8) -> Self {
        TrackEvent {
            tick,
            data: vec![0x80, note & 0x7F, 0],
        }
    }

    fn tempo(tick: u64, bpm: f64) -> Self {
        let microseconds = (60_000_000.0 / bpm) as u32;
        TrackEvent {
            tick,
            data: vec![
                0xFF,
                0x51,
                0x03,
                ((microseconds >> 16) & 0xFF) as u8,
                ((microseconds >> 8) & 0xFF) as u8,
                (microseconds & 0xFF) as u8,
            ],
        }
    }
}

/// Encode rendered events as Type 0 MIDI file bytes.
///
/// When `bpm` is given a tempo meta event is written at tick 0; otherwise
/// players fall back to their 120 bpm default. Events with level 0 still
/// produce note on/off pairs, which MIDI treats as silent.
pub fn encode(events: &[NoteEvent], bpm: Option<f64>) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    if let Some(bpm) = bpm {
        raw.push(TrackEvent::tempo(0, bpm));
    }

    let mut clock = 0u64;
    for event in events {
        let duration = (event.duration * FILE_PPQ as f64).round() as u64;
        if let Some(notes) = &event.notes {
            for note in notes {
                let midi = note_to_midi(note)?.clamp(0, 127) as u8;
                raw.push(TrackEvent::note_on(clock, midi, event.level));
                raw.push(TrackEvent::note_off(clock + duration, midi));
            }
        }
        clock += duration;
    }

    // Stable sort keeps a note-off ahead of a same-tick retrigger.
    raw.sort_by_key(|e| e.tick);

    let mut track_data = Vec::new();
    let mut last_tick = 0u64;
    for event in &raw {
        write_variable_length(&mut track_data, (event.tick - last_tick) as u32);
        track_data.extend_from_slice(&event.data);
        last_tick = event.tick;
    }
    write_variable_length(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let mut bytes = Vec::with_capacity(14 + 8 + track_data.len());
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&[0, 0, 0, 6]);
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&FILE_PPQ.to_be_bytes());
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&track_data);
    Ok(bytes)
}

/// Encode events and write them to `path`, appending a `.mid` extension
/// when the name does not already carry one
pub fn write_file<P: AsRef<Path>>(
    events: &[NoteEvent],
    bpm: Option<f64>,
    path: P,
) -> anyhow::Result<()> {
    let bytes = encode(events, bpm)?;
    let path = path.as_ref();
    let path = if path.extension().map_or(true, |ext| ext != "mid") {
        path.with_extension("mid")
    } else {
        path.to_path_buf()
    };
    fs::write(&path, bytes).with_context(|| format!("Failed to write MIDI file: {path:?}"))?;
    info!(path = %path.display(), "MIDI file written");
    Ok(())
}

/// Write a variable-length quantity
fn write_variable_length(out: &mut Vec<u8>, mut value: u32) {
    let mut bytes = Vec::new();

    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    out.extend_from_slice(&bytes);
}
