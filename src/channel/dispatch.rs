// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Step dispatch: binds note, duration, and velocity resolution to a clip's
//! steps and routes triggers to the acquired producer.
//!
//! The producer kind is matched exactly once, when the callback is built;
//! each step then runs a kind-specific trigger strategy. Trigger failures
//! are reported through the channel's event observer and never stop later
//! steps. The step counter advances once per `x`/`R` step no matter what,
//! including during silent warm-up before the channel finishes loading.

use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;
use tracing::warn;

use crate::channel::{ChannelEvent, LoadState, Observers, PlayedNote};
use crate::engine::sequence::StepFn;
use crate::engine::source::{ExternalOutput, SoundSource, SourceKind};
use crate::error::{Error, Result};
use crate::pattern::StepKind;

/// Resolved per-clip data the dispatcher needs at every step
pub(crate) struct DispatchData {
    /// Primary note pools, cycled by the step counter
    pub pool: Vec<Vec<String>>,
    /// Pool for `R` steps; empty or absent falls back to the primary pool
    pub random_pool: Option<Vec<Vec<String>>>,
    /// Per-step durations in seconds, cycled; explicit or derived from the
    /// pattern's step lengths
    pub durations: Option<Vec<f64>>,
    /// Fixed clip-level duration in seconds
    pub fixed_dur: Option<f64>,
    /// Subdivision length in seconds, the final fallback
    pub default_dur: f64,
    /// Velocity attached to emitted events
    pub velocity: u8,
}

type TriggerStrategy = Box<dyn FnMut(&[String], f64, f64) -> Result<()> + Send>;

/// Pick the trigger strategy for a producer kind. Done once per clip.
fn strategy_for(
    kind: SourceKind,
    producer: Option<Arc<Mutex<Box<dyn SoundSource>>>>,
    external: Option<Arc<Mutex<ExternalOutput>>>,
) -> TriggerStrategy {
    match kind {
        SourceKind::Player => {
            let producer = producer.expect("player kind carries a producer");
            Box::new(move |_notes, _duration, time| producer.lock().unwrap().start(time))
        }
        SourceKind::PolyOrSampler => {
            let producer = producer.expect("poly kind carries a producer");
            Box::new(move |notes, duration, time| {
                producer
                    .lock()
                    .unwrap()
                    .trigger_attack_release(notes, duration, time)
            })
        }
        SourceKind::NoiseSynth => {
            let producer = producer.expect("noise kind carries a producer");
            Box::new(move |_notes, duration, time| {
                producer
                    .lock()
                    .unwrap()
                    .trigger_attack_release(&[], duration, time)
            })
        }
        SourceKind::Generic => {
            let producer = producer.expect("generic kind carries a producer");
            Box::new(move |notes, duration, time| {
                let first = &notes[..notes.len().min(1)];
                producer
                    .lock()
                    .unwrap()
                    .trigger_attack_release(first, duration, time)
            })
        }
        SourceKind::External => {
            let external = external.expect("external kind carries a delegate");
            Box::new(move |notes, duration, time| {
                let mut delegate = external.lock().unwrap();
                if let (Some(trigger), Some(note)) = (delegate.trigger.as_mut(), notes.first()) {
                    trigger(note, duration, time).map_err(Error::Trigger)?;
                }
                Ok(())
            })
        }
    }
}

/// Build the per-step callback for one clip
pub(crate) fn build_step_callback(
    data: DispatchData,
    kind: SourceKind,
    producer: Option<Arc<Mutex<Box<dyn SoundSource>>>>,
    external: Option<Arc<Mutex<ExternalOutput>>>,
    state: Arc<Mutex<LoadState>>,
    counter: Arc<Mutex<usize>>,
    observers: Observers,
) -> StepFn {
    let mut trigger = strategy_for(kind, producer, external);

    Box::new(move |_transport, time, step_kind| {
        // Take the counter value and advance it unconditionally; nothing
        // below can skip the increment.
        let count = {
            let mut counter = counter.lock().unwrap();
            let value = *counter;
            *counter += 1;
            value
        };

        // Silent warm-up: no triggering before the channel is loaded.
        if !state.lock().unwrap().has_loaded {
            return;
        }

        let notes: Vec<String> = match step_kind {
            StepKind::RandomTrigger => {
                match data.random_pool.as_ref().filter(|p| !p.is_empty()) {
                    Some(random) => random
                        .choose(&mut rand::thread_rng())
                        .cloned()
                        .unwrap_or_default(),
                    None => primary_notes(&data.pool, count),
                }
            }
            StepKind::Trigger => primary_notes(&data.pool, count),
        };

        let duration = data
            .durations
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(|d| d[count % d.len()])
            .or(data.fixed_dur)
            .unwrap_or(data.default_dur);

        let played = PlayedNote {
            notes: notes.clone(),
            duration,
            time,
            counter: count,
            velocity: data.velocity,
        };
        {
            let mut observers = observers.lock().unwrap();
            if let Some(on_note) = observers.note.as_mut() {
                on_note(played);
            }
        }

        if let Err(err) = trigger(&notes, duration, time) {
            warn!(%err, "trigger failed");
            let mut observers = observers.lock().unwrap();
            if let Some(on_event) = observers.event.as_mut() {
                on_event(ChannelEvent::Error(err));
            }
        }
    })
}

fn primary_notes(pool: &[Vec<String>], count: usize) -> Vec<String> {
    pool.get(count % pool.len().max(1)).cloned().unwrap_or_default()
}
