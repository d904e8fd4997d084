// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Looping step sequences over the transport.
//!
//! A [`Sequence`] holds the tick offsets of a clip's steps within one cycle
//! and reschedules itself cycle by cycle. Start and stop take effect at
//! absolute tick positions so clips can be aligned ahead of time; a
//! generation counter invalidates tasks scheduled by a superseded
//! start/stop pair instead of chasing them through the queue.

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::engine::transport::Transport;
use crate::pattern::StepKind;

/// Per-step callback: transport (for nested scheduling), step time in
/// seconds, and the step kind.
pub type StepFn = Box<dyn FnMut(&mut Transport, f64, StepKind) + Send>;

struct SeqState {
    steps: Vec<(StepKind, u64)>,
    cycle_ticks: u64,
    started: bool,
    stop_at: Option<u64>,
    generation: u64,
}

/// A looping sequence of steps bound to one callback. Clones share state,
/// so a clone can start or stop the same underlying sequence.
#[derive(Clone)]
pub struct Sequence {
    state: Arc<Mutex<SeqState>>,
    callback: Arc<Mutex<StepFn>>,
}

impl Sequence {
    /// Create a stopped sequence. `steps` are (kind, tick offset within the
    /// cycle); `cycle_ticks` is the full cycle length.
    pub fn new(steps: Vec<(StepKind, u64)>, cycle_ticks: u64, callback: StepFn) -> Self {
        Sequence {
            state: Arc::new(Mutex::new(SeqState {
                steps,
                cycle_ticks,
                started: false,
                stop_at: None,
                generation: 0,
            })),
            callback: Arc::new(Mutex::new(callback)),
        }
    }

    /// Whether the sequence is currently started (a pending scheduled stop
    /// does not clear this until it fires)
    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().started
    }

    /// Cycle length in ticks
    pub fn cycle_ticks(&self) -> u64 {
        self.state.lock().unwrap().cycle_ticks
    }

    /// Start the sequence with its first cycle beginning at `at_tick`.
    /// Starting an already-started sequence is a no-op.
    pub fn start(&self, transport: &mut Transport, at_tick: u64) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            if state.started {
                return;
            }
            state.started = true;
            state.stop_at = None;
            state.generation += 1;
            state.generation
        };
        trace!(at_tick, "sequence start");
        schedule_cycle(&self.state, &self.callback, transport, at_tick, generation);
    }

    /// Stop the sequence at `at_tick`. Steps at or after the stop tick do
    /// not fire; the stop itself is effective immediately for steps already
    /// queued past it.
    pub fn stop(&self, transport: &mut Transport, at_tick: u64) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            if !state.started {
                return;
            }
            state.stop_at = Some(at_tick);
            state.generation
        };
        trace!(at_tick, "sequence stop");

        let state = Arc::clone(&self.state);
        transport.schedule_once(at_tick, move |_, _| {
            let mut state = state.lock().unwrap();
            // A restart may have superseded this stop.
            if state.generation == generation {
                state.started = false;
                state.generation += 1;
            }
        });
    }
}

/// True while tasks from this generation should still fire at `tick`
fn live(state: &Arc<Mutex<SeqState>>, generation: u64, tick: u64) -> bool {
    let state = state.lock().unwrap();
    state.started
        && state.generation == generation
        && state.stop_at.map_or(true, |stop| tick < stop)
}

fn schedule_cycle(
    state: &Arc<Mutex<SeqState>>,
    callback: &Arc<Mutex<StepFn>>,
    transport: &mut Transport,
    cycle_start: u64,
    generation: u64,
) {
    let (steps, cycle_ticks) = {
        let state = state.lock().unwrap();
        (state.steps.clone(), state.cycle_ticks)
    };

    for (kind, offset) in steps {
        let state = Arc::clone(state);
        let callback = Arc::clone(callback);
        transport.schedule_once(cycle_start + offset, move |transport, tick| {
            if !live(&state, generation, tick) {
                return;
            }
            let time = transport.ticks_to_seconds(tick);
            (callback.lock().unwrap())(transport, time, kind);
        });
    }

    // A zero-length cycle cannot make progress; rescheduling it at the same
    // tick would spin the transport forever.
    if cycle_ticks == 0 {
        return;
    }

    // End-of-cycle task chains the next cycle while the sequence is live.
    let state_ref = Arc::clone(state);
    let callback_ref = Arc::clone(callback);
    transport.schedule_once(cycle_start + cycle_ticks, move |transport, tick| {
        if !live(&state_ref, generation, tick + 1) {
            return;
        }
        schedule_cycle(&state_ref, &callback_ref, transport, tick, generation);
    });
}
