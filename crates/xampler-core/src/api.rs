//! Rhai API for samplers.
//!
//! Exposes a loaded [`Sampler`] to scripts for inspection and trigger
//! resolution. Playback itself stays with the host, which owns the engine.

use rhai::{Array, Dynamic, Engine, Map};
use std::sync::Arc;

use crate::sampler::Sampler;
use crate::types::PlaybackParams;

/// A handle to a sampler for use in scripts.
#[derive(Clone)]
pub struct SamplerHandle {
    sampler: Arc<Sampler>,
}

impl SamplerHandle {
    pub fn new(sampler: Arc<Sampler>) -> Self {
        Self { sampler }
    }

    pub fn sampler(&self) -> &Arc<Sampler> {
        &self.sampler
    }

    /// Get the number of consolidated regions.
    pub fn get_num_regions(&mut self) -> i64 {
        self.sampler.regions().len() as i64
    }

    /// Get the number of addressable key/velocity cells.
    pub fn get_num_cells(&mut self) -> i64 {
        self.sampler.keymap().len() as i64
    }

    /// Get the preloaded asset paths.
    pub fn get_assets(&mut self) -> Array {
        self.sampler
            .assets()
            .iter()
            .map(|asset| Dynamic::from(asset.path.clone()))
            .collect()
    }

    /// Resolve a trigger by note and integer velocity. Returns `()` when
    /// nothing matches.
    pub fn trigger_params(&mut self, note: i64, velocity: i64) -> Dynamic {
        let (Ok(note), Ok(velocity)) = (i32::try_from(note), i32::try_from(velocity)) else {
            return Dynamic::UNIT;
        };
        match self.sampler.get_trigger_params(note, velocity) {
            Some(params) => Dynamic::from_map(params_to_map(&params)),
            None => Dynamic::UNIT,
        }
    }

    /// Get a human-readable info string.
    pub fn info(&mut self) -> String {
        format!(
            "Sampler at '{}': {} regions, {} cells, {} samples",
            self.sampler.base_url(),
            self.sampler.regions().len(),
            self.sampler.keymap().len(),
            self.sampler.assets().len()
        )
    }
}

fn params_to_map(params: &PlaybackParams) -> Map {
    let mut map = Map::new();
    map.insert("sample".into(), params.sample.clone().into());
    map.insert("gain".into(), params.gain.into());
    map.insert("offset".into(), params.offset.into());
    map.insert("duration".into(), params.duration.into());
    map.insert("playback_rate".into(), params.playback_rate.into());
    map.insert("pan".into(), params.pan.into());
    map
}

/// Register the sampler types with a Rhai engine.
///
/// Constructing a sampler needs engine handles, so the host registers its
/// own loader function that returns a [`SamplerHandle`].
pub fn register_sampler_types(engine: &mut Engine) {
    engine.register_type_with_name::<SamplerHandle>("Sampler");

    engine.register_get("num_regions", SamplerHandle::get_num_regions);
    engine.register_get("num_cells", SamplerHandle::get_num_cells);
    engine.register_get("assets", SamplerHandle::get_assets);

    engine.register_fn("trigger_params", SamplerHandle::trigger_params);
    engine.register_fn("info", SamplerHandle::info);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::MemoryBufferPool;
    use crate::config::SamplerConfig;
    use crate::descriptor::{InstrumentDescriptor, RegionNode};
    use crate::engine::EngineHandles;
    use crate::offline::OfflineEngine;
    use crate::opcodes::Opcodes;
    use crate::types::BufferInfo;
    use rhai::Scope;

    fn handle() -> SamplerHandle {
        let descriptor = InstrumentDescriptor::new(
            "piano/",
            vec![
                RegionNode::leaf(Opcodes {
                    sample: Some("c4.wav".to_string()),
                    key: Some(60),
                    ..Default::default()
                }),
                RegionNode::leaf(Opcodes {
                    sample: Some("d4.wav".to_string()),
                    key: Some(62),
                    ..Default::default()
                }),
            ],
        );
        let buffers = Arc::new(MemoryBufferPool::new());
        buffers.insert("c4.wav", BufferInfo::new(48000.0, 96000, 2));
        let offline = Arc::new(OfflineEngine::new());
        let engine = EngineHandles::new(buffers, offline.clone(), offline);
        SamplerHandle::new(Arc::new(Sampler::new(
            &descriptor,
            engine,
            SamplerConfig::default(),
        )))
    }

    #[test]
    fn test_handle_methods() {
        let mut handle = handle();
        assert_eq!(handle.get_num_regions(), 2);
        assert_eq!(handle.get_num_cells(), 2 * 128);
        assert_eq!(handle.get_assets().len(), 2);
        assert!(handle.trigger_params(61, 64).is_unit());
        assert!(handle.trigger_params(i64::MAX, 64).is_unit());
        assert!(handle.info().contains("2 regions"));
    }

    #[test]
    fn test_script_access() {
        let mut engine = Engine::new();
        register_sampler_types(&mut engine);

        let mut scope = Scope::new();
        scope.push("piano", handle());

        let regions: i64 = engine
            .eval_with_scope(&mut scope, "piano.num_regions")
            .unwrap();
        assert_eq!(regions, 2);

        let assets: Array = engine.eval_with_scope(&mut scope, "piano.assets").unwrap();
        let first = assets[0].clone().into_string().unwrap();
        assert_eq!(first, "/piano/c4.wav");

        let duration: f64 = engine
            .eval_with_scope(&mut scope, "piano.trigger_params(60, 100).duration")
            .unwrap();
        assert!((duration - 2.0).abs() < 1e-9);

        // d4.wav has no buffer
        let missing: bool = engine
            .eval_with_scope(&mut scope, r#"type_of(piano.trigger_params(62, 100)) == "()""#)
            .unwrap();
        assert!(missing);
    }
}
