// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Channels: one sound producer plus its clips.
//!
//! Channel construction interleaves two branches: sound-source acquisition
//! kicks off asynchronously while every configured clip is compiled
//! synchronously, so pattern and pool errors surface immediately, annotated
//! with the failing clip's 1-based position. The channel flips to loaded or
//! failed when the acquisition lifecycle settles; until then its clips run
//! silent warm-up (counters advance, nothing triggers).

mod dispatch;

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::clip::ClipParams;
use crate::engine::sequence::Sequence;
use crate::engine::source::{ExternalOutput, SoundSource, SourceKind};
use crate::engine::transport::{SharedTransport, TaskId, Transport};
use crate::engine::{parse_time, ContextId, PPQ};
use crate::error::{Error, Result};
use crate::pattern::{assign_durations, expand_pattern, StepKind};
use crate::source::{acquire, SourceParams};

use dispatch::{build_step_callback, DispatchData};

/// Channel address: positional index or name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelId {
    Index(usize),
    Name(String),
}

impl From<usize> for ChannelId {
    fn from(idx: usize) -> Self {
        ChannelId::Index(idx)
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        ChannelId::Name(name.to_string())
    }
}

/// Lifecycle notifications delivered through the channel's event observer
#[derive(Debug)]
pub enum ChannelEvent {
    /// Acquisition completed; the channel now triggers audibly
    Loaded,
    /// An acquisition or trigger error. Acquisition errors are terminal
    /// for the channel; trigger errors are per-event.
    Error(Error),
}

/// One emitted event, observable before it reaches the producer
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedNote {
    /// Notes sounding together; empty for unpitched producers
    pub notes: Vec<String>,
    /// Sounding duration in seconds
    pub duration: f64,
    /// Transport time in seconds
    pub time: f64,
    /// Step counter value this event was resolved with
    pub counter: usize,
    /// Velocity 0-127
    pub velocity: u8,
}

/// Channel load state, shared with every clip's dispatcher
#[derive(Debug, Default)]
pub(crate) struct LoadState {
    pub has_loaded: bool,
    pub has_failed: bool,
}

pub(crate) struct ObserverSet {
    pub event: Option<Box<dyn FnMut(ChannelEvent) + Send>>,
    pub note: Option<Box<dyn FnMut(PlayedNote) + Send>>,
}

pub(crate) type Observers = Arc<Mutex<ObserverSet>>;

/// Channel construction parameters
#[derive(Default)]
pub struct ChannelParams {
    /// Display name, used in diagnostics
    pub name: String,
    /// Clips registered at construction, addressable by index
    pub clips: Vec<ClipParams>,
    /// Sound-source specification
    pub source: SourceParams,
    /// Observer for lifecycle and error events
    pub event_handler: Option<Box<dyn FnMut(ChannelEvent) + Send>>,
    /// Observer for every emitted note event
    pub note_handler: Option<Box<dyn FnMut(PlayedNote) + Send>>,
}

/// Cloneable handle to one clip's sequence and step counter, for
/// transitions that must execute inside a scheduled transport task
#[derive(Clone)]
pub(crate) struct ClipHandle {
    sequence: Sequence,
    counter: Arc<Mutex<usize>>,
}

impl ClipHandle {
    /// Reset the step counter and start the sequence at `at_tick`. Meant to
    /// run at `at_tick` itself, from inside a transport task.
    pub(crate) fn start(&self, transport: &mut Transport, at_tick: u64) {
        *self.counter.lock().unwrap() = 0;
        self.sequence.start(transport, at_tick);
    }

    /// Stop the sequence at `at_tick`
    pub(crate) fn stop(&self, transport: &mut Transport, at_tick: u64) {
        self.sequence.stop(transport, at_tick);
    }
}

/// One compiled clip bound to the transport
struct LiveClip {
    sequence: Sequence,
    counter: Arc<Mutex<usize>>,
    align_ticks: u64,
    align_offset_ticks: u64,
    reset_task: Option<TaskId>,
}

/// A sound producer plus its clips, scheduled against the shared transport
pub struct Channel {
    transport: SharedTransport,
    context: ContextId,
    idx: usize,
    name: String,
    clips: Vec<LiveClip>,
    active: Option<usize>,
    state: Arc<Mutex<LoadState>>,
    observers: Observers,
    producer: Option<Arc<Mutex<Box<dyn SoundSource>>>>,
    external: Option<Arc<Mutex<ExternalOutput>>>,
    kind: SourceKind,
}

impl Channel {
    /// Construct a channel: start acquisition, compile every clip, and wire
    /// the loaded/failed transition to the acquisition outcome.
    ///
    /// Configuration and clip-compilation errors return synchronously (clip
    /// errors annotated with their 1-based position); acquisition failures
    /// arrive later through the event observer and leave the channel
    /// permanently failed.
    pub fn new(
        transport: SharedTransport,
        context: ContextId,
        idx: usize,
        params: ChannelParams,
    ) -> Result<Channel> {
        let ChannelParams {
            name,
            clips,
            source,
            event_handler,
            note_handler,
        } = params;

        let acquired = acquire(context, source)?;
        let state = Arc::new(Mutex::new(LoadState::default()));
        let observers: Observers = Arc::new(Mutex::new(ObserverSet {
            event: event_handler,
            note: note_handler,
        }));

        let bpm = transport.lock().unwrap().bpm();
        let mut live_clips = Vec::with_capacity(clips.len());
        for (i, clip) in clips.iter().enumerate() {
            let live = build_live_clip(
                clip,
                bpm,
                acquired.kind,
                acquired.producer.clone(),
                acquired.external.clone(),
                Arc::clone(&state),
                Arc::clone(&observers),
            )
            .map_err(|e| e.in_clip(i + 1))?;
            live_clips.push(live);
        }

        let ready_state = Arc::clone(&state);
        let ready_observers = Arc::clone(&observers);
        let idx_str = idx.to_string();
        let channel_name = name.clone();
        acquired.ready.on_ready(move |result| match result {
            Ok(()) => {
                ready_state.lock().unwrap().has_loaded = true;
                debug!(channel = %channel_name, "channel loaded");
                if let Some(on_event) = ready_observers.lock().unwrap().event.as_mut() {
                    on_event(ChannelEvent::Loaded);
                }
            }
            Err(message) => {
                ready_state.lock().unwrap().has_failed = true;
                let error = Error::Acquisition {
                    channel_idx: idx_str,
                    channel_name,
                    message,
                };
                warn!(%error, "channel failed");
                if let Some(on_event) = ready_observers.lock().unwrap().event.as_mut() {
                    on_event(ChannelEvent::Error(error));
                }
            }
        });

        Ok(Channel {
            transport,
            context,
            idx,
            name,
            clips: live_clips,
            active: None,
            state,
            observers,
            producer: acquired.producer,
            external: acquired.external,
            kind: acquired.kind,
        })
    }

    /// Channel index within its session
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Playback context this channel's producer lives in
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Number of registered clips
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Whether acquisition completed successfully
    pub fn has_loaded(&self) -> bool {
        self.state.lock().unwrap().has_loaded
    }

    /// Whether acquisition failed; failed channels stay failed
    pub fn has_failed(&self) -> bool {
        self.state.lock().unwrap().has_failed
    }

    /// Register an additional clip at the next index
    pub fn add_clip(&mut self, clip: &ClipParams) -> Result<()> {
        let bpm = self.transport.lock().unwrap().bpm();
        let live = build_live_clip(
            clip,
            bpm,
            self.kind,
            self.producer.clone(),
            self.external.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.observers),
        )
        .map_err(|e| e.in_clip(self.clips.len() + 1))?;
        self.clips.push(live);
        Ok(())
    }

    /// Start clip `idx`. Without an explicit position the clip starts at 0
    /// while the transport is still inside its first beat, otherwise at the
    /// next position on the clip's alignment grid. Any other active clip is
    /// stopped at the same resolved position, and the clip's step counter
    /// reset is scheduled there too. Starting a started clip is a no-op.
    pub fn start_clip(&mut self, idx: usize, position: Option<u64>) {
        if idx >= self.clips.len() {
            warn!(idx, channel = %self.name, "start for unknown clip");
            return;
        }

        let mut transport = self.transport.lock().unwrap();
        let position = position.unwrap_or_else(|| {
            next_aligned(
                &transport,
                self.clips[idx].align_ticks,
                self.clips[idx].align_offset_ticks,
            )
        });

        if let Some(active) = self.active {
            if active != idx {
                self.clips[active].sequence.stop(&mut transport, position);
            }
        }

        let clip = &mut self.clips[idx];
        if clip.sequence.is_started() {
            return;
        }

        // The counter must reset exactly when playback begins, not when
        // this call schedules it.
        if let Some(previous) = clip.reset_task.take() {
            transport.cancel(previous);
        }
        let counter = Arc::clone(&clip.counter);
        clip.reset_task = Some(transport.schedule_once(position, move |_, _| {
            *counter.lock().unwrap() = 0;
        }));

        clip.sequence.start(&mut transport, position);
        self.active = Some(idx);
    }

    /// Stop clip `idx` using the same default-position rule as
    /// [`Channel::start_clip`]. Clears the active marker only when the
    /// stopped clip is the active one.
    pub fn stop_clip(&mut self, idx: usize, position: Option<u64>) {
        if idx >= self.clips.len() {
            warn!(idx, channel = %self.name, "stop for unknown clip");
            return;
        }

        let mut transport = self.transport.lock().unwrap();
        let position = position.unwrap_or_else(|| {
            next_aligned(
                &transport,
                self.clips[idx].align_ticks,
                self.clips[idx].align_offset_ticks,
            )
        });
        self.clips[idx].sequence.stop(&mut transport, position);
        if self.active == Some(idx) {
            self.active = None;
        }
    }

    /// Index of the currently active clip
    pub fn active_clip(&self) -> Option<usize> {
        self.active
    }

    /// Shared handle to clip `idx`, if it exists
    pub(crate) fn clip_handle(&self, idx: usize) -> Option<ClipHandle> {
        self.clips.get(idx).map(|clip| ClipHandle {
            sequence: clip.sequence.clone(),
            counter: Arc::clone(&clip.counter),
        })
    }

    /// Set the producer's output volume (forwarded to an external
    /// delegate's volume hook if that is what this channel drives)
    pub fn set_volume(&mut self, volume: f64) {
        if let Some(producer) = &self.producer {
            producer.lock().unwrap().set_volume(volume);
        }
        if let Some(external) = &self.external {
            if let Some(set_volume) = external.lock().unwrap().set_volume.as_mut() {
                set_volume(volume);
            }
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("idx", &self.idx)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("clips", &self.clips.len())
            .field("active", &self.active)
            .field("loaded", &self.has_loaded())
            .field("failed", &self.has_failed())
            .finish()
    }
}

/// Default start/stop position: 0 while the transport is inside its very
/// first beat, otherwise the next alignment-grid position after now.
pub(crate) fn next_aligned(transport: &Transport, grid_ticks: u64, offset_ticks: u64) -> u64 {
    let now = transport.ticks();
    if now < PPQ {
        return 0;
    }
    let grid = grid_ticks.max(1);
    (now / grid + 1) * grid + offset_ticks
}

/// Compile one clip into a transport-ready sequence with its dispatcher
fn build_live_clip(
    params: &ClipParams,
    bpm: f64,
    kind: SourceKind,
    producer: Option<Arc<Mutex<Box<dyn SoundSource>>>>,
    external: Option<Arc<Mutex<ExternalOutput>>>,
    state: Arc<Mutex<LoadState>>,
    observers: Observers,
) -> Result<LiveClip> {
    let mut pool = params.notes.resolve()?;
    if params.shuffle {
        pool.shuffle(&mut rand::thread_rng());
    }
    let random_pool = params
        .random_notes
        .as_ref()
        .map(|input| input.resolve())
        .transpose()?;

    let tree = expand_pattern(&params.pattern)?;
    let unit = parse_time(&params.subdiv)?;
    let unit_ticks = unit.to_ticks(bpm);
    let timed_steps = assign_durations(&tree, unit_ticks as f64);
    let steps: Vec<(StepKind, u64)> = timed_steps
        .iter()
        .map(|step| (step.kind, step.offset.round() as u64))
        .collect();
    let cycle_ticks = unit_ticks * tree.len() as u64;

    let fixed_dur = match &params.dur {
        Some(dur) => Some(parse_time(dur)?.to_seconds(bpm)),
        None => None,
    };
    // Without explicit durations the pattern's own step lengths apply, so
    // sustains and subdivided groups sound their true span.
    let seconds_per_tick = 60.0 / (bpm * PPQ as f64);
    let durations = match (&params.durations, fixed_dur) {
        (Some(explicit), _) => Some(explicit.clone()),
        (None, Some(_)) => None,
        (None, None) => Some(
            timed_steps
                .iter()
                .map(|step| step.duration * seconds_per_tick)
                .collect(),
        ),
    };
    let align_ticks = parse_time(params.align.as_deref().unwrap_or("1m"))?.to_ticks(bpm);
    let align_offset_ticks =
        parse_time(params.align_offset.as_deref().unwrap_or("0"))?.to_ticks(bpm);

    let counter = Arc::new(Mutex::new(0));
    let callback = build_step_callback(
        DispatchData {
            pool,
            random_pool,
            durations,
            fixed_dur,
            default_dur: unit.to_seconds(bpm),
            velocity: params.amp,
        },
        kind,
        producer,
        external,
        state,
        Arc::clone(&counter),
        observers,
    );

    Ok(LiveClip {
        sequence: Sequence::new(steps, cycle_ticks, callback),
        counter,
        align_ticks,
        align_offset_ticks,
        reset_task: None,
    })
}
