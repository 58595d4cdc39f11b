//! The sampler: descriptor in, voices out.

use crate::config::SamplerConfig;
use crate::consolidate::{asset_requests, consolidate};
use crate::descriptor::InstrumentDescriptor;
use crate::engine::EngineHandles;
use crate::keymap::KeyVelocityMap;
use crate::params::resolve_entry;
use crate::types::{AssetRequest, NoteKey, PlaybackParams, Region};
use crate::voices::{Voice, VoiceRegistry};
use std::sync::Arc;

/// One or several notes triggered together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notes(Vec<i32>);

impl Notes {
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }
}

impl From<i32> for Notes {
    fn from(note: i32) -> Self {
        Self(vec![note])
    }
}

impl From<Vec<i32>> for Notes {
    fn from(notes: Vec<i32>) -> Self {
        Self(notes)
    }
}

impl From<&[i32]> for Notes {
    fn from(notes: &[i32]) -> Self {
        Self(notes.to_vec())
    }
}

impl<const N: usize> From<[i32; N]> for Notes {
    fn from(notes: [i32; N]) -> Self {
        Self(notes.to_vec())
    }
}

/// A playable instrument built from a descriptor.
///
/// Construction consolidates the region tree, builds the key/velocity map
/// and asks the buffer pool to preload every sample. After that the lookup
/// side is read-only; only the voice registry changes.
///
/// Triggers are issued from one control thread. Completion notifications may
/// arrive on any thread; the registry serializes them.
pub struct Sampler {
    config: SamplerConfig,
    base_url: String,
    regions: Vec<Region>,
    assets: Vec<AssetRequest>,
    keymap: KeyVelocityMap,
    voices: VoiceRegistry,
    engine: EngineHandles,
}

impl Sampler {
    pub fn new(descriptor: &InstrumentDescriptor, engine: EngineHandles, config: SamplerConfig) -> Self {
        let base_url = descriptor.base_url();
        let regions = consolidate(&descriptor.instrument.regions);
        let keymap = KeyVelocityMap::build(&regions);
        let assets = asset_requests(&regions, &base_url);

        for asset in &assets {
            log::debug!("Preloading '{}' from {}", asset.sample, asset.path);
        }
        if let Err(e) = engine.buffers.preload(&assets) {
            log::warn!("Failed to preload samples: {:#}", e);
        }

        log::info!(
            "Sampler ready: {} regions, {} cells, {} samples under {}",
            regions.len(),
            keymap.len(),
            assets.len(),
            base_url
        );

        Self {
            config,
            base_url,
            regions,
            assets,
            keymap,
            voices: VoiceRegistry::new(),
            engine,
        }
    }

    /// Trigger notes at full velocity.
    pub fn trigger_attack(&self, notes: impl Into<Notes>, time: f64) -> &Self {
        self.trigger_attack_with_velocity(notes, time, 1.0)
    }

    /// Trigger notes at `time` with a 0..1 velocity.
    ///
    /// Each note is handled on its own: a note that resolves to nothing is
    /// logged and skipped without affecting the others.
    pub fn trigger_attack_with_velocity(
        &self,
        notes: impl Into<Notes>,
        time: f64,
        velocity: f64,
    ) -> &Self {
        let notes: Notes = notes.into();
        for note in notes.iter() {
            self.trigger_note(note, time, velocity);
        }
        self
    }

    fn trigger_note(&self, note: i32, time: f64, velocity: f64) {
        let scaled = velocity * self.config.velocity_scale;
        let params = self
            .config
            .lookup_velocity(velocity)
            .map(|v| NoteKey::new(note, v))
            .and_then(|key| self.resolve_key(key).map(|params| (key, params)));
        let Some((key, params)) = params else {
            log::warn!("No region found for note {} velocity {}", note, scaled);
            return;
        };

        let source = match self.engine.sources.create_source(
            &params.sample,
            &params.buffer,
            params.playback_rate,
        ) {
            Ok(source) => source,
            Err(e) => {
                log::warn!(
                    "Failed to create source for note {} velocity {} ('{}'): {:#}",
                    note,
                    scaled,
                    params.sample,
                    e
                );
                return;
            }
        };
        self.engine.output.connect(&source, params.pan);

        let id = self
            .voices
            .insert(Voice::new(key, params.sample.clone(), Arc::clone(&source)));
        source.set_on_ended(self.voices.completion_callback(key, id));

        log::debug!(
            "{} on {}: '{}' gain={:.4} offset={:.3} dur={:.3} rate={:.4} pan={:.2}",
            id,
            key,
            params.sample,
            params.gain,
            params.offset,
            params.duration,
            params.playback_rate,
            params.pan
        );
        source.start(
            time,
            params.offset,
            params.duration,
            params.gain * self.config.headroom,
        );
    }

    /// Resolve a trigger with a 0..1 velocity without playing anything.
    pub fn resolve(&self, note: i32, velocity: f64) -> Option<PlaybackParams> {
        let velocity = self.config.lookup_velocity(velocity)?;
        self.resolve_key(NoteKey::new(note, velocity))
    }

    /// Resolve a trigger addressed by its integer lookup velocity.
    pub fn get_trigger_params(&self, note: i32, velocity: i32) -> Option<PlaybackParams> {
        self.resolve_key(NoteKey::new(note, velocity))
    }

    fn resolve_key(&self, key: NoteKey) -> Option<PlaybackParams> {
        let entry = self.keymap.first(key)?;
        resolve_entry(entry, self.engine.buffers.as_ref())
    }

    /// Consolidated regions, in document order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Preload requests issued at construction.
    pub fn assets(&self) -> &[AssetRequest] {
        &self.assets
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn keymap(&self) -> &KeyVelocityMap {
        &self.keymap
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}
