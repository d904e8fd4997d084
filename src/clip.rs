// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline clip rendering.
//!
//! Runs one pass of a clip's pattern against its resolved note pools and
//! produces a finite event list: the same step semantics the live dispatcher
//! uses, but against a synthetic clock, with velocity shaping (accent maps
//! and sizzle curves) applied per trigger.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::parse_time;
use crate::error::{Error, Result};
use crate::pattern::{expand_pattern, PatternElement};
use crate::theory::{chord::chord, is_note};

/// Tempo used when a subdivision is given in raw seconds
const DEFAULT_BPM: f64 = 120.0;

/// Note pool input: a name string, a list of notes, or pre-resolved pools
#[derive(Debug, Clone, PartialEq)]
pub enum NoteInput {
    /// Space-separated note or chord names, e.g. `"C4 E4"` or `"CM_4 FM_4"`
    Names(String),
    /// Individual note names, one pool entry each
    List(Vec<String>),
    /// Pre-resolved pools; each inner list sounds together
    Pools(Vec<Vec<String>>),
}

impl Default for NoteInput {
    fn default() -> Self {
        NoteInput::Names("C4".to_string())
    }
}

impl NoteInput {
    /// Resolve into note pools; chord names expand via the theory resolver
    pub fn resolve(&self) -> Result<Vec<Vec<String>>> {
        match self {
            NoteInput::Names(names) => names
                .split_whitespace()
                .map(|token| {
                    if is_note(token) {
                        Ok(vec![token.to_string()])
                    } else {
                        chord(token)
                    }
                })
                .collect(),
            NoteInput::List(notes) => notes
                .iter()
                .map(|note| {
                    if is_note(note) {
                        Ok(vec![note.clone()])
                    } else {
                        Err(Error::InvalidNote(note.clone()))
                    }
                })
                .collect(),
            NoteInput::Pools(pools) => {
                for pool in pools {
                    for note in pool {
                        if !is_note(note) {
                            return Err(Error::InvalidNote(note.clone()));
                        }
                    }
                }
                Ok(pools.clone())
            }
        }
    }
}

/// Velocity curve applied across a rendered pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizzleStyle {
    Sin,
    Cos,
    RampUp,
    RampDown,
}

/// Everything needed to compile and render one clip
pub struct ClipParams {
    /// Primary note pool
    pub notes: NoteInput,
    /// Pattern string over `x - _ [ ] R`
    pub pattern: String,
    /// Full-shuffle the primary pool before use
    pub shuffle: bool,
    /// Time value of one top-level pattern slot
    pub subdiv: String,
    /// Alignment grid for live start/stop; defaults to one measure
    pub align: Option<String>,
    /// Offset added to the alignment grid
    pub align_offset: Option<String>,
    /// Peak velocity, 0-127
    pub amp: u8,
    /// Accent map of `x`/`-` over trigger positions
    pub accent: Option<String>,
    /// Velocity for unaccented triggers
    pub accent_low: u8,
    /// Velocity curve; overrides the accent map
    pub sizzle: Option<SizzleStyle>,
    /// Curve repetitions across one pass
    pub sizzle_reps: u32,
    /// Pool for `R` steps; when absent they pull from the primary pool
    pub random_notes: Option<NoteInput>,
    /// Fixed sounding duration overriding the slot length (live dispatch)
    pub dur: Option<String>,
    /// Per-step sounding durations in seconds, cycled (live dispatch)
    pub durations: Option<Vec<f64>>,
}

impl Default for ClipParams {
    fn default() -> Self {
        ClipParams {
            notes: NoteInput::default(),
            pattern: "x".to_string(),
            shuffle: false,
            subdiv: "4n".to_string(),
            align: None,
            align_offset: None,
            amp: 100,
            accent: None,
            accent_low: 70,
            sizzle: None,
            sizzle_reps: 1,
            random_notes: None,
            dur: None,
            durations: None,
        }
    }
}

impl ClipParams {
    /// A clip with the given pattern and default everything else
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        ClipParams {
            pattern: pattern.into(),
            ..Default::default()
        }
    }
}

/// One rendered event. `notes: None` is silence that still occupies time.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Notes sounding together, or `None` for a rest
    pub notes: Option<Vec<String>>,
    /// Duration in quarter-note units, sustains merged in
    pub duration: f64,
    /// Velocity 0-127; 0 for rests
    pub level: u8,
}

fn walk<R: Rng>(
    elements: &[PatternElement],
    length: f64,
    pool: &[Vec<String>],
    random_pool: Option<&[Vec<String>]>,
    counter: &mut usize,
    events: &mut Vec<NoteEvent>,
    rng: &mut R,
) {
    for element in elements {
        match element {
            PatternElement::Note => {
                let notes = pool.get(*counter % pool.len().max(1)).cloned();
                events.push(NoteEvent {
                    notes,
                    duration: length,
                    level: 0,
                });
                *counter += 1;
            }
            PatternElement::RandomNote => {
                let notes = match random_pool.filter(|p| !p.is_empty()) {
                    Some(random) => random.choose(rng).cloned(),
                    None => pool.get(*counter % pool.len().max(1)).cloned(),
                };
                events.push(NoteEvent {
                    notes,
                    duration: length,
                    level: 0,
                });
                *counter += 1;
            }
            PatternElement::Rest => events.push(NoteEvent {
                notes: None,
                duration: length,
                level: 0,
            }),
            PatternElement::Sustain => {
                if let Some(last) = events.last_mut() {
                    last.duration += length;
                }
            }
            PatternElement::Group(children) => {
                if !children.is_empty() {
                    walk(
                        children,
                        length / children.len() as f64,
                        pool,
                        random_pool,
                        counter,
                        events,
                        rng,
                    );
                }
            }
        }
    }
}

/// Velocity for trigger `i` of `n` in one pass
fn level_for(params: &ClipParams, i: usize, n: usize) -> u8 {
    let low = params.accent_low as f64;
    let span = params.amp as f64 - low;
    let n = n.max(1) as f64;

    if let Some(style) = params.sizzle {
        let phase = std::f64::consts::PI * params.sizzle_reps as f64 * i as f64 / n;
        let value = match style {
            SizzleStyle::Sin => low + span * phase.sin().abs(),
            SizzleStyle::Cos => low + span * phase.cos().abs(),
            SizzleStyle::RampUp => low + span * (i as f64 / n),
            SizzleStyle::RampDown => low + span * (1.0 - i as f64 / n),
        };
        return value.round().clamp(0.0, 127.0) as u8;
    }

    if let Some(accent) = &params.accent {
        let accented = accent
            .chars()
            .nth(i % accent.chars().count().max(1))
            .map(|c| c == 'x')
            .unwrap_or(false);
        return if accented { params.amp } else { params.accent_low };
    }

    params.amp
}

/// Render one pass of a clip into a finite event list.
///
/// Triggers pull from the pools exactly as the live dispatcher does: the
/// step counter cycles the primary pool, `R` picks uniformly from the
/// random pool when one exists. Rests become silent events so downstream
/// encoders keep time; sustains merge into the previous event.
pub fn render_clip(params: &ClipParams) -> Result<Vec<NoteEvent>> {
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
    let unit = parse_time(&params.subdiv)?.quarters(DEFAULT_BPM);

    let mut events = Vec::new();
    let mut counter = 0usize;
    walk(
        &tree,
        unit,
        &pool,
        random_pool.as_deref(),
        &mut counter,
        &mut events,
        &mut rand::thread_rng(),
    );

    // Velocity shaping runs over triggers only; rests stay at level 0.
    let trigger_count = events.iter().filter(|e| e.notes.is_some()).count();
    let mut trigger_index = 0;
    for event in &mut events {
        if event.notes.is_some() {
            event.level = level_for(params, trigger_index, trigger_count);
            trigger_index += 1;
        }
    }

    Ok(events)
}
