// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration system for riffle.
//!
//! This module provides data structures for loading session definitions
//! (tempo, channels, clips) from YAML and turning them into a live
//! [`Session`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelParams;
use crate::clip::{ClipParams, NoteInput, SizzleStyle};
use crate::engine::source::SharedBuffer;
use crate::session::Session;
use crate::source::{SourceParams, SynthParams};

/// Root configuration for a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionFile {
    /// Session metadata and settings
    pub session: SessionConfig,
    /// Channel definitions
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl SessionFile {
    /// Load a session configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse a session configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Build a live session from this configuration.
    ///
    /// Sample URLs become pending buffers; loading them is the embedding
    /// audio backend's job, so sample-backed channels start in warm-up.
    pub fn build_session(&self) -> Result<Session> {
        let mut session = Session::new(self.session.tempo);
        for channel in &self.channels {
            let params = channel
                .to_channel_params()
                .with_context(|| format!("Failed to build channel {:?}", channel.name))?;
            session
                .create_channel(params)
                .with_context(|| format!("Failed to create channel {:?}", channel.name))?;
        }
        Ok(session)
    }
}

/// Session-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Session name
    pub name: String,
    /// Tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
}

fn default_tempo() -> f64 {
    120.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            tempo: default_tempo(),
        }
    }
}

/// Channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Channel name (used for lookup and diagnostics)
    pub name: String,
    /// Synth name for synth-backed channels
    #[serde(default)]
    pub synth: Option<String>,
    /// Synth preset name
    #[serde(default)]
    pub preset: Option<String>,
    /// Single sample URL for player-backed channels
    #[serde(default)]
    pub sample: Option<String>,
    /// Note-to-URL sample dictionary for sampler-backed channels
    #[serde(default)]
    pub samples: HashMap<String, String>,
    /// Output volume
    #[serde(default)]
    pub volume: Option<f64>,
    /// Effect names chained onto the producer, in order
    #[serde(default)]
    pub effects: Vec<String>,
    /// Clip definitions, addressable by index
    #[serde(default)]
    pub clips: Vec<ClipConfig>,
}

impl ChannelConfig {
    /// Build channel construction parameters from this configuration
    pub fn to_channel_params(&self) -> Result<ChannelParams> {
        let mut source = SourceParams {
            volume: self.volume,
            effects: self
                .effects
                .iter()
                .cloned()
                .map(crate::engine::source::EffectSpec::Name)
                .collect(),
            ..Default::default()
        };
        if let Some(name) = &self.synth {
            source.synth = Some(SynthParams {
                name: name.clone(),
                preset_name: self.preset.clone(),
            });
        }
        if let Some(url) = &self.sample {
            source.sample = Some(SharedBuffer::new(url));
        }
        if !self.samples.is_empty() {
            source.samples = Some(
                self.samples
                    .iter()
                    .map(|(note, url)| (note.clone(), SharedBuffer::new(url)))
                    .collect(),
            );
        }

        Ok(ChannelParams {
            name: self.name.clone(),
            clips: self.clips.iter().map(ClipConfig::to_clip_params).collect(),
            source,
            event_handler: None,
            note_handler: None,
        })
    }
}

/// Clip configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipConfig {
    /// Pattern string over `x - _ [ ] R`
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Space-separated note or chord names
    #[serde(default)]
    pub notes: Option<String>,
    /// Time value of one top-level pattern slot
    #[serde(default = "default_subdiv")]
    pub subdiv: String,
    /// Peak velocity (0-127)
    #[serde(default = "default_amp")]
    pub amp: u8,
    /// Accent map of `x`/`-` over trigger positions
    #[serde(default)]
    pub accent: Option<String>,
    /// Velocity for unaccented triggers
    #[serde(default = "default_accent_low")]
    pub accent_low: u8,
    /// Shuffle the note pool before use
    #[serde(default)]
    pub shuffle: bool,
    /// Velocity curve applied across a pass
    #[serde(default)]
    pub sizzle: Option<SizzleStyle>,
    /// Curve repetitions across one pass
    #[serde(default = "default_sizzle_reps")]
    pub sizzle_reps: u32,
    /// Pool for `R` steps
    #[serde(default)]
    pub random_notes: Option<String>,
    /// Fixed sounding duration as a time value string
    #[serde(default)]
    pub dur: Option<String>,
    /// Per-step sounding durations in seconds, cycled
    #[serde(default)]
    pub durations: Option<Vec<f64>>,
    /// Alignment grid for live start/stop
    #[serde(default)]
    pub align: Option<String>,
    /// Offset added to the alignment grid
    #[serde(default)]
    pub align_offset: Option<String>,
}

fn default_pattern() -> String {
    "x".to_string()
}
fn default_subdiv() -> String {
    "4n".to_string()
}
fn default_amp() -> u8 {
    100
}
fn default_accent_low() -> u8 {
    70
}
fn default_sizzle_reps() -> u32 {
    1
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            notes: None,
            subdiv: default_subdiv(),
            amp: default_amp(),
            accent: None,
            accent_low: default_accent_low(),
            shuffle: false,
            sizzle: None,
            sizzle_reps: default_sizzle_reps(),
            random_notes: None,
            dur: None,
            durations: None,
            align: None,
            align_offset: None,
        }
    }
}

impl ClipConfig {
    /// Build clip parameters from this configuration
    pub fn to_clip_params(&self) -> ClipParams {
        ClipParams {
            notes: self
                .notes
                .as_ref()
                .map(|n| NoteInput::Names(n.clone()))
                .unwrap_or_default(),
            pattern: self.pattern.clone(),
            shuffle: self.shuffle,
            subdiv: self.subdiv.clone(),
            align: self.align.clone(),
            align_offset: self.align_offset.clone(),
            amp: self.amp,
            accent: self.accent.clone(),
            accent_low: self.accent_low,
            sizzle: self.sizzle,
            sizzle_reps: self.sizzle_reps,
            random_notes: self.random_notes.as_ref().map(|n| NoteInput::Names(n.clone())),
            dur: self.dur.clone(),
            durations: self.durations.clone(),
        }
    }
}
