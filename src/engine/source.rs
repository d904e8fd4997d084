// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sound-producer contract and built-in producers.
//!
//! A [`SoundSource`] is anything a channel can trigger: synths, sample
//! players, samplers. Each producer exposes one public readiness primitive
//! (a [`ReadySignal`]) instead of callers poking at internal buffer state,
//! reports which [`SourceKind`] it is so the dispatcher can pick a trigger
//! strategy once at acquisition time, and can recreate itself in another
//! execution context during context reconciliation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::engine::ContextId;
use crate::error::Result;

/// Closed set of producer capabilities, fixed at acquisition time.
/// The step dispatcher switches on this tag once, not per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One-shot buffer player; triggering means `start(time)`
    Player,
    /// Polyphonic synth or sampler; takes the full note list per trigger
    PolyOrSampler,
    /// Unpitched synth; triggered with duration and time only
    NoiseSynth,
    /// External output delegate; receives the first note of each event
    External,
    /// Any other instrument; receives the first note of each event
    Generic,
}

enum ReadyState {
    Pending,
    Ready,
    Failed(String),
}

type ReadyCallback = Box<dyn FnOnce(std::result::Result<(), String>) + Send>;

struct ReadyInner {
    state: ReadyState,
    callbacks: Vec<ReadyCallback>,
}

/// One-shot readiness signal: pending until resolved or failed exactly once.
/// Subscribers added after settlement are invoked immediately.
#[derive(Clone)]
pub struct ReadySignal {
    inner: Arc<Mutex<ReadyInner>>,
}

impl ReadySignal {
    /// A signal that has not settled yet
    pub fn pending() -> Self {
        ReadySignal {
            inner: Arc::new(Mutex::new(ReadyInner {
                state: ReadyState::Pending,
                callbacks: Vec::new(),
            })),
        }
    }

    /// A signal that is already resolved
    pub fn ready() -> Self {
        let signal = Self::pending();
        signal.resolve();
        signal
    }

    /// Whether the signal has resolved successfully
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, ReadyState::Ready)
    }

    /// Whether the signal has failed
    pub fn is_failed(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, ReadyState::Failed(_))
    }

    /// Resolve the signal; later resolutions and failures are ignored
    pub fn resolve(&self) {
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.state, ReadyState::Pending) {
                return;
            }
            inner.state = ReadyState::Ready;
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            callback(Ok(()));
        }
    }

    /// Fail the signal with a message; only the first settlement counts
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.state, ReadyState::Pending) {
                return;
            }
            inner.state = ReadyState::Failed(message.clone());
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            callback(Err(message.clone()));
        }
    }

    /// Subscribe to settlement. Fires immediately if already settled.
    pub fn on_ready(
        &self,
        callback: impl FnOnce(std::result::Result<(), String>) + Send + 'static,
    ) {
        let settled = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.state {
                ReadyState::Pending => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
                ReadyState::Ready => Ok(()),
                ReadyState::Failed(message) => Err(message.clone()),
            }
        };
        callback(settled);
    }

    /// Combine signals: resolves when all resolve, fails on the first
    /// failure. Used for container producers with nested loadables.
    pub fn when_all(signals: &[ReadySignal]) -> ReadySignal {
        let combined = ReadySignal::pending();
        if signals.is_empty() {
            combined.resolve();
            return combined;
        }
        let remaining = Arc::new(Mutex::new(signals.len()));
        for signal in signals {
            let combined = combined.clone();
            let remaining = Arc::clone(&remaining);
            signal.on_ready(move |result| match result {
                Ok(()) => {
                    let mut left = remaining.lock().unwrap();
                    *left -= 1;
                    if *left == 0 {
                        combined.resolve();
                    }
                }
                Err(message) => combined.fail(message),
            });
        }
        combined
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.lock().unwrap().state {
            ReadyState::Pending => "pending",
            ReadyState::Ready => "ready",
            ReadyState::Failed(_) => "failed",
        };
        write!(f, "ReadySignal({})", state)
    }
}

/// One note trigger captured by a built-in producer
#[derive(Debug, Clone, PartialEq)]
pub struct Triggered {
    /// Notes sounded together
    pub notes: Vec<String>,
    /// Duration in seconds
    pub duration: f64,
    /// Transport time in seconds
    pub time: f64,
}

/// Log of triggers, shared so tests can observe playback after the producer
/// moved into its channel
pub type TriggerLog = Arc<Mutex<Vec<Triggered>>>;

/// The capability set every sound producer exposes
pub trait SoundSource: Send {
    /// Producer capability tag
    fn kind(&self) -> SourceKind;

    /// Execution context the producer was built in
    fn context(&self) -> ContextId;

    /// The producer's single public readiness primitive
    fn ready(&self) -> ReadySignal;

    /// Sound the given notes for `duration` seconds at transport time `time`
    fn trigger_attack_release(&mut self, notes: &[String], duration: f64, time: f64)
        -> Result<()>;

    /// Start continuous playback at transport time `time`
    fn start(&mut self, time: f64) -> Result<()>;

    /// Stop continuous playback at transport time `time`
    fn stop(&mut self, time: f64) -> Result<()>;

    /// Output volume, linear gain
    fn volume(&self) -> f64;

    /// Set output volume
    fn set_volume(&mut self, volume: f64);

    /// Chain effects serially onto the producer's output
    fn chain(&mut self, effects: Vec<Effect>);

    /// Recreate an equivalent producer in another context, copying
    /// type-specific configuration. The new instance reports its own
    /// readiness.
    fn recreate_in(&self, context: ContextId) -> Result<Box<dyn SoundSource>>;
}

/// A deferred-loading audio buffer with a public readiness signal.
/// Cloning shares the underlying load state.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    url: String,
    ready: ReadySignal,
}

impl SharedBuffer {
    /// A buffer whose load has been requested but not completed
    pub fn new(url: impl Into<String>) -> Self {
        SharedBuffer {
            url: url.into(),
            ready: ReadySignal::pending(),
        }
    }

    /// A buffer that is already loaded
    pub fn new_loaded(url: impl Into<String>) -> Self {
        SharedBuffer {
            url: url.into(),
            ready: ReadySignal::ready(),
        }
    }

    /// Source URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Readiness of the load
    pub fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    /// Mark the load complete
    pub fn finish_loading(&self) {
        self.ready.resolve();
    }

    /// Mark the load failed
    pub fn fail_loading(&self, message: impl Into<String>) {
        self.ready.fail(message);
    }
}

/// An effect node chained onto a producer's output
#[derive(Debug, Clone)]
pub struct Effect {
    name: String,
    context: ContextId,
    ready: ReadySignal,
}

impl Effect {
    /// Construct an effect by name in a context
    pub fn new(name: impl Into<String>, context: ContextId) -> Self {
        Effect {
            name: name.into(),
            context,
            ready: ReadySignal::ready(),
        }
    }

    /// Effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context the effect was built in
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Readiness of the effect
    pub fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    /// Recreate the effect in another context
    pub fn recreate_in(&self, context: ContextId) -> Effect {
        Effect::new(self.name.clone(), context)
    }
}

/// Effect request: a name to construct, or a pre-built node to adopt
#[derive(Debug, Clone)]
pub enum EffectSpec {
    /// Construct the effect by name in the playback context
    Name(String),
    /// Adopt a pre-built effect, reconciling its context if needed
    Node(Effect),
}

/// Delegate that routes triggers to an external consumer instead of an
/// owned producer. Has no execution context and cannot carry effects.
#[derive(Default)]
pub struct ExternalOutput {
    /// Called once with the playback context before first use; returning
    /// an error fails acquisition
    pub init: Option<Box<dyn FnOnce(ContextId) -> std::result::Result<(), String> + Send>>,
    /// Called per event with (note, duration seconds, time seconds)
    pub trigger: Option<Box<dyn FnMut(&str, f64, f64) -> std::result::Result<(), String> + Send>>,
    /// Forwarded the channel volume when one is configured
    pub set_volume: Option<Box<dyn FnMut(f64) + Send>>,
}

impl fmt::Debug for ExternalOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalOutput")
            .field("init", &self.init.is_some())
            .field("trigger", &self.trigger.is_some())
            .field("set_volume", &self.set_volume.is_some())
            .finish()
    }
}

/// A named synth with an optional preset. Ready immediately; the name
/// decides the dispatch kind (`PolySynth`, `NoiseSynth`, anything else is
/// a generic instrument).
pub struct Synth {
    name: String,
    preset_name: Option<String>,
    context: ContextId,
    ready: ReadySignal,
    volume: f64,
    effects: Vec<Effect>,
    triggered: TriggerLog,
}

impl Synth {
    /// Construct a synth by name in a context
    pub fn new(name: impl Into<String>, context: ContextId) -> Self {
        Synth {
            name: name.into(),
            preset_name: None,
            context,
            ready: ReadySignal::ready(),
            volume: 1.0,
            effects: Vec::new(),
            triggered: TriggerLog::default(),
        }
    }

    /// Attach a preset name
    pub fn with_preset(mut self, preset_name: impl Into<String>) -> Self {
        self.preset_name = Some(preset_name.into());
        self
    }

    /// Synth name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared trigger log for observing playback
    pub fn trigger_log(&self) -> TriggerLog {
        Arc::clone(&self.triggered)
    }
}

impl SoundSource for Synth {
    fn kind(&self) -> SourceKind {
        match self.name.as_str() {
            "PolySynth" => SourceKind::PolyOrSampler,
            "NoiseSynth" => SourceKind::NoiseSynth,
            _ => SourceKind::Generic,
        }
    }

    fn context(&self) -> ContextId {
        self.context
    }

    fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    fn trigger_attack_release(
        &mut self,
        notes: &[String],
        duration: f64,
        time: f64,
    ) -> Result<()> {
        self.triggered.lock().unwrap().push(Triggered {
            notes: notes.to_vec(),
            duration,
            time,
        });
        Ok(())
    }

    fn start(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn chain(&mut self, effects: Vec<Effect>) {
        self.effects.extend(effects);
    }

    fn recreate_in(&self, context: ContextId) -> Result<Box<dyn SoundSource>> {
        Ok(Box::new(Synth {
            name: self.name.clone(),
            preset_name: self.preset_name.clone(),
            context,
            ready: ReadySignal::ready(),
            volume: self.volume,
            effects: Vec::new(),
            // The log is shared so observers keep seeing triggers after
            // context migration.
            triggered: Arc::clone(&self.triggered),
        }))
    }
}

/// One-shot player over a single deferred buffer; ready when the buffer is
pub struct Player {
    buffer: SharedBuffer,
    context: ContextId,
    volume: f64,
    effects: Vec<Effect>,
    triggered: TriggerLog,
}

impl Player {
    /// Construct a player over a buffer
    pub fn new(buffer: SharedBuffer, context: ContextId) -> Self {
        Player {
            buffer,
            context,
            volume: 1.0,
            effects: Vec::new(),
            triggered: TriggerLog::default(),
        }
    }

    /// The player's buffer
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Shared trigger log for observing playback
    pub fn trigger_log(&self) -> TriggerLog {
        Arc::clone(&self.triggered)
    }
}

impl SoundSource for Player {
    fn kind(&self) -> SourceKind {
        SourceKind::Player
    }

    fn context(&self) -> ContextId {
        self.context
    }

    fn ready(&self) -> ReadySignal {
        self.buffer.ready()
    }

    fn trigger_attack_release(
        &mut self,
        _notes: &[String],
        _duration: f64,
        time: f64,
    ) -> Result<()> {
        self.start(time)
    }

    fn start(&mut self, time: f64) -> Result<()> {
        self.triggered.lock().unwrap().push(Triggered {
            notes: Vec::new(),
            duration: 0.0,
            time,
        });
        Ok(())
    }

    fn stop(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn chain(&mut self, effects: Vec<Effect>) {
        self.effects.extend(effects);
    }

    fn recreate_in(&self, context: ContextId) -> Result<Box<dyn SoundSource>> {
        // The buffer's load state is shared, not re-fetched.
        Ok(Box::new(Player {
            buffer: self.buffer.clone(),
            context,
            volume: self.volume,
            effects: Vec::new(),
            triggered: Arc::clone(&self.triggered),
        }))
    }
}

/// Multi-buffer sampler mapping note names to buffers.
///
/// There is no aggregate readiness signal across the note map, so the
/// sampler reports ready eagerly; the first few triggers can race a buffer
/// that is still loading. Known limitation, kept deliberately.
pub struct Sampler {
    buffers: HashMap<String, SharedBuffer>,
    context: ContextId,
    volume: f64,
    effects: Vec<Effect>,
    triggered: TriggerLog,
}

impl Sampler {
    /// Construct a sampler from a note-to-buffer map
    pub fn new(buffers: HashMap<String, SharedBuffer>, context: ContextId) -> Self {
        Sampler {
            buffers,
            context,
            volume: 1.0,
            effects: Vec::new(),
            triggered: TriggerLog::default(),
        }
    }

    /// Shared trigger log for observing playback
    pub fn trigger_log(&self) -> TriggerLog {
        Arc::clone(&self.triggered)
    }
}

impl SoundSource for Sampler {
    fn kind(&self) -> SourceKind {
        SourceKind::PolyOrSampler
    }

    fn context(&self) -> ContextId {
        self.context
    }

    fn ready(&self) -> ReadySignal {
        ReadySignal::ready()
    }

    fn trigger_attack_release(
        &mut self,
        notes: &[String],
        duration: f64,
        time: f64,
    ) -> Result<()> {
        for note in notes {
            if let Some(buffer) = self.buffers.get(note) {
                if !buffer.ready().is_ready() {
                    warn!(note = %note, url = buffer.url(), "sampler buffer not loaded yet");
                }
            }
        }
        self.triggered.lock().unwrap().push(Triggered {
            notes: notes.to_vec(),
            duration,
            time,
        });
        Ok(())
    }

    fn start(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn chain(&mut self, effects: Vec<Effect>) {
        self.effects.extend(effects);
    }

    fn recreate_in(&self, context: ContextId) -> Result<Box<dyn SoundSource>> {
        Ok(Box::new(Sampler {
            buffers: self.buffers.clone(),
            context,
            volume: self.volume,
            effects: Vec::new(),
            triggered: Arc::clone(&self.triggered),
        }))
    }
}

/// Unpitched noise synth; triggered with duration and time only
pub struct NoiseSynth {
    context: ContextId,
    volume: f64,
    effects: Vec<Effect>,
    triggered: TriggerLog,
}

impl NoiseSynth {
    /// Construct a noise synth in a context
    pub fn new(context: ContextId) -> Self {
        NoiseSynth {
            context,
            volume: 1.0,
            effects: Vec::new(),
            triggered: TriggerLog::default(),
        }
    }

    /// Shared trigger log for observing playback
    pub fn trigger_log(&self) -> TriggerLog {
        Arc::clone(&self.triggered)
    }
}

impl SoundSource for NoiseSynth {
    fn kind(&self) -> SourceKind {
        SourceKind::NoiseSynth
    }

    fn context(&self) -> ContextId {
        self.context
    }

    fn ready(&self) -> ReadySignal {
        ReadySignal::ready()
    }

    fn trigger_attack_release(
        &mut self,
        _notes: &[String],
        duration: f64,
        time: f64,
    ) -> Result<()> {
        self.triggered.lock().unwrap().push(Triggered {
            notes: Vec::new(),
            duration,
            time,
        });
        Ok(())
    }

    fn start(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self, _time: f64) -> Result<()> {
        Ok(())
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn chain(&mut self, effects: Vec<Effect>) {
        self.effects.extend(effects);
    }

    fn recreate_in(&self, context: ContextId) -> Result<Box<dyn SoundSource>> {
        Ok(Box::new(NoiseSynth {
            context,
            volume: self.volume,
            effects: Vec::new(),
            triggered: Arc::clone(&self.triggered),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_signal_settles_once() {
        let signal = ReadySignal::pending();
        assert!(!signal.is_ready());
        signal.resolve();
        assert!(signal.is_ready());
        signal.fail("too late");
        assert!(signal.is_ready());
        assert!(!signal.is_failed());
    }

    #[test]
    fn test_on_ready_after_settlement_fires_immediately() {
        let signal = ReadySignal::ready();
        let fired = Arc::new(Mutex::new(false));
        let fired2 = Arc::clone(&fired);
        signal.on_ready(move |result| {
            assert!(result.is_ok());
            *fired2.lock().unwrap() = true;
        });
        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn test_on_ready_before_settlement_fires_on_resolve() {
        let signal = ReadySignal::pending();
        let seen = Arc::new(Mutex::new(None));
        let seen2 = Arc::clone(&seen);
        signal.on_ready(move |result| {
            *seen2.lock().unwrap() = Some(result);
        });
        assert!(seen.lock().unwrap().is_none());

        signal.resolve();
        assert_eq!(*seen.lock().unwrap(), Some(Ok(())));
    }

    #[test]
    fn test_when_all_waits_for_every_signal() {
        let a = ReadySignal::pending();
        let b = ReadySignal::pending();
        let all = ReadySignal::when_all(&[a.clone(), b.clone()]);

        a.resolve();
        assert!(!all.is_ready());
        b.resolve();
        assert!(all.is_ready());
    }

    #[test]
    fn test_when_all_fails_on_first_failure() {
        let a = ReadySignal::pending();
        let b = ReadySignal::pending();
        let all = ReadySignal::when_all(&[a.clone(), b.clone()]);

        a.fail("load rejected");
        assert!(all.is_failed());
        b.resolve();
        assert!(all.is_failed());
    }

    #[test]
    fn test_synth_kind_from_name() {
        let ctx = ContextId::new();
        assert_eq!(Synth::new("PolySynth", ctx).kind(), SourceKind::PolyOrSampler);
        assert_eq!(Synth::new("NoiseSynth", ctx).kind(), SourceKind::NoiseSynth);
        assert_eq!(Synth::new("FMSynth", ctx).kind(), SourceKind::Generic);
    }

    #[test]
    fn test_player_ready_follows_buffer() {
        let buffer = SharedBuffer::new("kick.wav");
        let player = Player::new(buffer.clone(), ContextId::new());
        assert!(!player.ready().is_ready());
        buffer.finish_loading();
        assert!(player.ready().is_ready());
    }

    #[test]
    fn test_recreate_in_changes_context_and_shares_log() {
        let ctx = ContextId::new();
        let other = ContextId::new();
        let synth = Synth::new("PolySynth", ctx);
        let log = synth.trigger_log();

        let mut moved = synth.recreate_in(other).unwrap();
        assert_eq!(moved.context(), other);
        moved
            .trigger_attack_release(&["C4".to_string()], 0.5, 0.0)
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
