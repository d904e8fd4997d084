// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sessions: a set of channels on one shared transport.
//!
//! A session owns no per-note state. It coordinates simultaneous clip
//! starts across channels and drives song-structure strings, where each
//! character selects the clip to occupy one fixed-duration slot.

use std::fmt;

use tracing::{debug, warn};

use crate::channel::{Channel, ChannelId, ChannelParams, ClipHandle};
use crate::engine::transport::{SharedTransport, Transport};
use crate::engine::{parse_time, ContextId, PPQ};
use crate::error::Result;

/// One channel's song-structure line
#[derive(Debug, Clone)]
pub struct ChannelPattern {
    /// Index of the channel this line drives
    pub channel_idx: usize,
    /// Song-structure string: digits select a clip slot, `-` is silence,
    /// `_` continues the previous selection without re-triggering
    pub pattern: String,
}

/// Song-structure playback parameters
#[derive(Debug, Clone)]
pub struct PlayParams {
    pub channel_patterns: Vec<ChannelPattern>,
    /// Duration of one song-structure character, as a time value string
    pub clip_duration: String,
}

impl Default for PlayParams {
    fn default() -> Self {
        PlayParams {
            channel_patterns: Vec::new(),
            clip_duration: "4:0:0".to_string(),
        }
    }
}

/// An ordered collection of channels sharing one transport and context
pub struct Session {
    transport: SharedTransport,
    context: ContextId,
    channels: Vec<Channel>,
}

impl Session {
    /// Create an empty session with its own transport at `bpm`
    pub fn new(bpm: f64) -> Self {
        Session {
            transport: Transport::shared(bpm),
            context: ContextId::new(),
            channels: Vec::new(),
        }
    }

    /// The shared transport driving every channel
    pub fn transport(&self) -> SharedTransport {
        SharedTransport::clone(&self.transport)
    }

    /// Playback context channels are acquired into
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Create a channel and return its index
    pub fn create_channel(&mut self, params: ChannelParams) -> Result<usize> {
        let idx = self.channels.len();
        let channel = Channel::new(self.transport(), self.context, idx, params)?;
        debug!(idx, name = channel.name(), "channel created");
        self.channels.push(channel);
        Ok(idx)
    }

    /// Look up a channel by index or name
    pub fn channel(&self, id: impl Into<ChannelId>) -> Option<&Channel> {
        match id.into() {
            ChannelId::Index(idx) => self.channels.get(idx),
            ChannelId::Name(name) => self.channels.iter().find(|c| c.name() == name),
        }
    }

    /// Look up a channel mutably by index or name
    pub fn channel_mut(&mut self, id: impl Into<ChannelId>) -> Option<&mut Channel> {
        match id.into() {
            ChannelId::Index(idx) => self.channels.get_mut(idx),
            ChannelId::Name(name) => self.channels.iter_mut().find(|c| c.name() == name),
        }
    }

    /// Change the transport tempo
    pub fn set_tempo(&mut self, bpm: f64) {
        self.transport.lock().unwrap().set_bpm(bpm);
    }

    /// Start the transport clock
    pub fn start_transport(&mut self) {
        self.transport.lock().unwrap().start();
    }

    /// Stop the transport clock. Scheduled callbacks stay queued and resume
    /// firing after the next [`Session::start_transport`].
    pub fn stop_transport(&mut self) {
        self.transport.lock().unwrap().stop();
    }

    /// Stop the transport clock and drop every pending scheduled callback
    pub fn stop_and_clear(&mut self) {
        let mut transport = self.transport.lock().unwrap();
        transport.stop();
        transport.cancel_pending();
    }

    /// Start clip `clip_idx` on every channel that has one, at a single
    /// shared position so the row comes in together. Channels without that
    /// clip index are skipped.
    pub fn start_row(&mut self, clip_idx: usize) {
        let position = {
            let transport = self.transport.lock().unwrap();
            crate::channel::next_aligned(&transport, 4 * PPQ, 0)
        };
        for channel in &mut self.channels {
            if clip_idx < channel.clip_count() {
                channel.start_clip(clip_idx, Some(position));
            }
        }
    }

    /// Stop every channel's active clip at the next shared measure boundary
    pub fn stop_all(&mut self) {
        let position = {
            let transport = self.transport.lock().unwrap();
            crate::channel::next_aligned(&transport, 4 * PPQ, 0)
        };
        for channel in &mut self.channels {
            if let Some(active) = channel.active_clip() {
                channel.stop_clip(active, Some(position));
            }
        }
    }

    /// Schedule song-structure playback. Each character of a channel's
    /// pattern occupies one `clip_duration` slot; a transition happens only
    /// when the character actually changes (`_` continues the previous
    /// selection, `-` stops it). Every channel's active clip is stopped at
    /// the end of its line.
    ///
    /// Slot positions are resolved relative to the transport's current tick,
    /// and each transition runs as a scheduled task at its slot tick, so the
    /// outgoing clip's stop and the incoming clip's start land on the exact
    /// same position. The caller advances the clock.
    pub fn play(&mut self, params: PlayParams) -> Result<()> {
        let mut transport = self.transport.lock().unwrap();
        let slot_ticks = parse_time(&params.clip_duration)?.to_ticks(transport.bpm());
        let base = transport.ticks();

        for line in &params.channel_patterns {
            let Some(channel) = self.channels.get(line.channel_idx) else {
                warn!(idx = line.channel_idx, "song line for unknown channel");
                continue;
            };

            let mut current: Option<ClipHandle> = None;
            let mut current_idx: Option<usize> = None;
            let mut slots = 0u64;
            for ch in line.pattern.chars() {
                let at = base + slots * slot_ticks;
                slots += 1;
                match ch {
                    '_' => {}
                    '-' => {
                        current_idx = None;
                        if let Some(previous) = current.take() {
                            transport
                                .schedule_once(at, move |t, tick| previous.stop(t, tick));
                        }
                    }
                    digit if digit.is_ascii_digit() => {
                        let idx = digit.to_digit(10).unwrap() as usize;
                        if current_idx == Some(idx) {
                            continue;
                        }
                        let Some(next) = channel.clip_handle(idx) else {
                            warn!(idx, channel = channel.name(), "song line names unknown clip");
                            continue;
                        };
                        let previous = current.replace(next.clone());
                        current_idx = Some(idx);
                        transport.schedule_once(at, move |t, tick| {
                            if let Some(previous) = previous {
                                previous.stop(t, tick);
                            }
                            next.start(t, tick);
                        });
                    }
                    other => {
                        warn!(char = %other, "ignoring unknown song-structure character");
                    }
                }
            }
            if let Some(previous) = current {
                let at = base + slots * slot_ticks;
                transport.schedule_once(at, move |t, tick| previous.stop(t, tick));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("channels", &self.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PlayedNote;
    use crate::clip::{ClipParams, NoteInput};
    use crate::source::{SourceParams, SynthParams};
    use std::sync::{Arc, Mutex};

    fn clip(note: &str) -> ClipParams {
        ClipParams {
            notes: NoteInput::Names(note.to_string()),
            pattern: "x".to_string(),
            ..Default::default()
        }
    }

    fn synth_params(
        name: &str,
        clips: Vec<ClipParams>,
        log: &Arc<Mutex<Vec<PlayedNote>>>,
    ) -> ChannelParams {
        let log = Arc::clone(log);
        ChannelParams {
            name: name.to_string(),
            clips,
            source: SourceParams {
                synth: Some(SynthParams::named("PolySynth")),
                ..Default::default()
            },
            note_handler: Some(Box::new(move |note| log.lock().unwrap().push(note))),
            ..Default::default()
        }
    }

    #[test]
    fn test_song_structure_switches_and_stops() {
        let mut session = Session::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let idx = session
            .create_channel(synth_params("lead", vec![clip("C4"), clip("G4")], &log))
            .unwrap();

        session.start_transport();
        session
            .play(PlayParams {
                channel_patterns: vec![ChannelPattern {
                    channel_idx: idx,
                    pattern: "0___1___".to_string(),
                }],
                // one second per slot
                clip_duration: "1".to_string(),
            })
            .unwrap();

        // 8 one-second slots at 120 bpm span 16 quarters; run past the end.
        session.transport().lock().unwrap().advance_to(20 * PPQ);

        let played = log.lock().unwrap();
        let first_g = played.iter().find(|p| p.notes[0] == "G4").unwrap();
        assert_eq!(first_g.time, 4.0);
        assert_eq!(played.iter().filter(|p| p.notes[0] == "C4").count(), 8);
        assert_eq!(played.iter().filter(|p| p.notes[0] == "G4").count(), 8);
        // Nothing fires after the final stop at t=8.
        assert!(played.iter().all(|p| p.time < 8.0));
    }

    #[test]
    fn test_song_structure_silence_slot() {
        let mut session = Session::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let idx = session
            .create_channel(synth_params("lead", vec![clip("C4")], &log))
            .unwrap();

        session.start_transport();
        session
            .play(PlayParams {
                channel_patterns: vec![ChannelPattern {
                    channel_idx: idx,
                    pattern: "0-0-".to_string(),
                }],
                clip_duration: "1".to_string(),
            })
            .unwrap();
        session.transport().lock().unwrap().advance_to(10 * PPQ);

        // Each one-second slot holds two quarter-note steps; two audible
        // slots with the steps at their start count.
        let times: Vec<f64> = log.lock().unwrap().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 2.0, 2.5]);
    }

    #[test]
    fn test_start_row_is_simultaneous() {
        let mut session = Session::new(120.0);
        let log_a = Arc::new(Mutex::new(Vec::new()));
        let log_b = Arc::new(Mutex::new(Vec::new()));
        session
            .create_channel(synth_params("a", vec![clip("C4")], &log_a))
            .unwrap();
        session
            .create_channel(synth_params("b", vec![clip("E4")], &log_b))
            .unwrap();

        session.start_transport();
        session.transport().lock().unwrap().advance_to(PPQ + 7);
        session.start_row(0);
        session.transport().lock().unwrap().advance_to(5 * PPQ);

        let first_a = log_a.lock().unwrap()[0].time;
        let first_b = log_b.lock().unwrap()[0].time;
        assert_eq!(first_a, first_b);
    }

    #[test]
    fn test_stop_and_clear_cancels_pending() {
        let mut session = Session::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let idx = session
            .create_channel(synth_params("lead", vec![clip("C4")], &log))
            .unwrap();

        session.start_transport();
        session.channel_mut(idx).unwrap().start_clip(0, Some(0));
        session.transport().lock().unwrap().advance_to(PPQ);
        let before = log.lock().unwrap().len();

        session.stop_and_clear();
        assert_eq!(session.transport().lock().unwrap().pending(), 0);
        session.start_transport();
        session.transport().lock().unwrap().advance_to(8 * PPQ);
        assert_eq!(log.lock().unwrap().len(), before);
    }

    #[test]
    fn test_stop_transport_keeps_scheduled_events() {
        let mut session = Session::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let idx = session
            .create_channel(synth_params("lead", vec![clip("C4")], &log))
            .unwrap();

        session.start_transport();
        session.channel_mut(idx).unwrap().start_clip(0, Some(0));
        session.transport().lock().unwrap().advance_to(PPQ);
        let before = log.lock().unwrap().len();

        session.stop_transport();
        assert!(session.transport().lock().unwrap().pending() > 0);
        session.start_transport();
        session.transport().lock().unwrap().advance_to(3 * PPQ);
        assert!(log.lock().unwrap().len() > before);
    }

    #[test]
    fn test_channel_lookup_by_name_and_index() {
        let mut session = Session::new(96.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        session
            .create_channel(synth_params("drums", vec![clip("C2")], &log))
            .unwrap();

        assert_eq!(session.channel(0).unwrap().name(), "drums");
        assert_eq!(session.channel("drums").unwrap().idx(), 0);
        assert!(session.channel("bass").is_none());
        assert!(session.channel(5).is_none());
    }
}
