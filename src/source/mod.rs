// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sound-source acquisition and lifecycle.
//!
//! Turns a source specification into a ready-to-trigger producer in up to
//! three ordered phases, each possibly asynchronous:
//!
//! 1. construction (build or adopt the producer, wait for it to load),
//! 2. context reconciliation (recreate the producer in the playback context
//!    if it was built elsewhere, wait for the new instance),
//! 3. post-processing (apply volume, construct and chain effects).
//!
//! Configuration errors (no source, conflicting sources, effects on an
//! external output) are synchronous. Everything later is delivered through
//! the returned [`ReadySignal`], never thrown into unrelated code.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::engine::source::{
    Effect, EffectSpec, ExternalOutput, Player, ReadySignal, Sampler, SharedBuffer, SoundSource,
    SourceKind, Synth,
};
use crate::engine::ContextId;
use crate::error::{Error, Result};

/// Named-synth specification
#[derive(Debug, Clone)]
pub struct SynthParams {
    /// Synth name, e.g. `"PolySynth"` or `"FMSynth"`
    pub name: String,
    /// Optional preset to apply at construction
    pub preset_name: Option<String>,
}

impl SynthParams {
    /// Synth by name with no preset
    pub fn named(name: impl Into<String>) -> Self {
        SynthParams {
            name: name.into(),
            preset_name: None,
        }
    }
}

/// Source specification: exactly one alternative must be supplied
#[derive(Default)]
pub struct SourceParams {
    /// Named synth with optional preset
    pub synth: Option<SynthParams>,
    /// Pre-built instrument to adopt
    pub instrument: Option<Box<dyn SoundSource>>,
    /// Single sample buffer, played as a one-shot
    pub sample: Option<SharedBuffer>,
    /// Note-to-buffer sample dictionary
    pub samples: Option<HashMap<String, SharedBuffer>>,
    /// Pre-built sampler to adopt
    pub sampler: Option<Box<dyn SoundSource>>,
    /// Pre-built player to adopt
    pub player: Option<Box<dyn SoundSource>>,
    /// External output delegate instead of an owned producer
    pub external: Option<ExternalOutput>,
    /// Output volume, applied in post-processing
    pub volume: Option<f64>,
    /// Effects chained serially onto the producer, in array order
    pub effects: Vec<EffectSpec>,
}

impl SourceParams {
    /// Names of the supplied source alternatives
    fn supplied(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.synth.is_some() {
            names.push("synth");
        }
        if self.instrument.is_some() {
            names.push("instrument");
        }
        if self.sample.is_some() {
            names.push("sample");
        }
        if self.samples.is_some() {
            names.push("samples");
        }
        if self.sampler.is_some() {
            names.push("sampler");
        }
        if self.player.is_some() {
            names.push("player");
        }
        if self.external.is_some() {
            names.push("external");
        }
        names
    }

    /// Check the exactly-one-source rule and the effects/external conflict
    pub fn validate(&self) -> Result<()> {
        let supplied = self.supplied();
        match supplied.len() {
            0 => return Err(Error::MissingSource),
            1 => {}
            _ => return Err(Error::ConflictingSources(supplied.join(", "))),
        }
        if self.external.is_some() && !self.effects.is_empty() {
            return Err(Error::EffectsWithExternal);
        }
        Ok(())
    }
}

/// Outcome of acquisition: either an owned producer or an external delegate,
/// plus the dispatch kind and the lifecycle readiness signal
pub struct Acquired {
    /// Owned producer; `None` for external outputs
    pub producer: Option<Arc<Mutex<Box<dyn SoundSource>>>>,
    /// External delegate; `None` for owned producers
    pub external: Option<Arc<Mutex<ExternalOutput>>>,
    /// Capability tag for the dispatcher
    pub kind: SourceKind,
    /// Settles when all three lifecycle phases completed (or failed)
    pub ready: ReadySignal,
}

impl fmt::Debug for Acquired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquired")
            .field("kind", &self.kind)
            .field("has_producer", &self.producer.is_some())
            .field("ready", &self.ready)
            .finish()
    }
}

/// Acquire a sound producer in the given playback context.
///
/// Configuration errors return synchronously; construction, reconciliation,
/// and post-processing failures settle the returned [`ReadySignal`] as
/// failed with a descriptive message.
pub fn acquire(context: ContextId, params: SourceParams) -> Result<Acquired> {
    params.validate()?;

    let SourceParams {
        synth,
        instrument,
        sample,
        samples,
        sampler,
        player,
        external,
        volume,
        effects,
    } = params;

    let ready = ReadySignal::pending();

    // External outputs have no context and no effects; the lifecycle is
    // just the optional init hook.
    if let Some(mut external) = external {
        let init = external.init.take();
        if let Some(volume) = volume {
            if let Some(set_volume) = external.set_volume.as_mut() {
                set_volume(volume);
            }
        }
        match init.map(|init| init(context)).transpose() {
            Ok(_) => ready.resolve(),
            Err(message) => ready.fail(message),
        }
        return Ok(Acquired {
            producer: None,
            external: Some(Arc::new(Mutex::new(external))),
            kind: SourceKind::External,
            ready,
        });
    }

    // Phase 1: construct or adopt.
    let producer: Box<dyn SoundSource> = if let Some(spec) = synth {
        let mut synth = Synth::new(spec.name, context);
        if let Some(preset) = spec.preset_name {
            synth = synth.with_preset(preset);
        }
        Box::new(synth)
    } else if let Some(buffer) = sample {
        Box::new(Player::new(buffer, context))
    } else if let Some(buffers) = samples {
        Box::new(Sampler::new(buffers, context))
    } else if let Some(adopted) = instrument.or(sampler).or(player) {
        adopted
    } else {
        unreachable!("validated above");
    };

    let kind = producer.kind();
    let construction_ready = producer.ready();
    let producer = Arc::new(Mutex::new(producer));

    let chain_producer = Arc::clone(&producer);
    let chain_ready = ready.clone();
    construction_ready.on_ready(move |result| {
        if let Err(message) = result {
            chain_ready.fail(message);
            return;
        }

        // Phase 2: recreate in the playback context if needed.
        let recreated = {
            let guard = chain_producer.lock().unwrap();
            if guard.context() == context {
                None
            } else {
                debug!(?context, "reconciling producer context");
                match guard.recreate_in(context) {
                    Ok(new) => Some(new),
                    Err(err) => {
                        drop(guard);
                        chain_ready.fail(err.to_string());
                        return;
                    }
                }
            }
        };

        match recreated {
            None => finish(&chain_producer, context, volume, effects, &chain_ready),
            Some(new) => {
                let new_ready = new.ready();
                *chain_producer.lock().unwrap() = new;
                let post_producer = Arc::clone(&chain_producer);
                let post_ready = chain_ready.clone();
                new_ready.on_ready(move |result| match result {
                    Ok(()) => finish(&post_producer, context, volume, effects, &post_ready),
                    Err(message) => post_ready.fail(message),
                });
            }
        }
    });

    Ok(Acquired {
        producer: Some(producer),
        external: None,
        kind,
        ready,
    })
}

/// Phase 3: volume and effects, then settle the lifecycle
fn finish(
    producer: &Arc<Mutex<Box<dyn SoundSource>>>,
    context: ContextId,
    volume: Option<f64>,
    effects: Vec<EffectSpec>,
    ready: &ReadySignal,
) {
    let mut guard = producer.lock().unwrap();
    if let Some(volume) = volume {
        guard.set_volume(volume);
    }
    if !effects.is_empty() {
        let nodes: Vec<Effect> = effects
            .into_iter()
            .map(|spec| match spec {
                EffectSpec::Name(name) => Effect::new(name, context),
                EffectSpec::Node(node) => {
                    if node.context() == context {
                        node
                    } else {
                        node.recreate_in(context)
                    }
                }
            })
            .collect();
        guard.chain(nodes);
    }
    drop(guard);
    ready.resolve();
}
