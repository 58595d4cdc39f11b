//! Sample-based instrument playback.
//!
//! This crate turns a hierarchical instrument description into playable
//! voices:
//! - Region inheritance is consolidated into flat leaf regions
//! - Key and velocity ranges are expanded into a discrete lookup map
//! - Each trigger resolves gain, offset, duration, playback rate and pan
//! - Playing voices are tracked and reclaimed when their source finishes
//!
//! # Architecture
//!
//! The crate is independent of the audio backend. Buffer storage, playback
//! sources and the output chain are capabilities passed in through
//! [`EngineHandles`]; [`OfflineEngine`] records everything for tests and
//! the command line tool.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xampler_core::{EngineHandles, InstrumentDescriptor, OfflineEngine, Sampler, SamplerConfig, WavBufferPool};
//!
//! let descriptor = InstrumentDescriptor::from_path("piano.sfz")?;
//! let offline = Arc::new(OfflineEngine::new());
//! let engine = EngineHandles::new(Arc::new(WavBufferPool::new(".")), offline.clone(), offline);
//! let sampler = Sampler::new(&descriptor, engine, SamplerConfig::default());
//!
//! sampler.trigger_attack([60, 64, 67], 0.0);
//! ```

pub mod api;
pub mod buffers;
pub mod config;
pub mod consolidate;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod keymap;
pub mod offline;
pub mod opcodes;
pub mod params;
pub mod parser;
pub mod sampler;
pub mod types;
pub mod voices;

pub use api::{register_sampler_types, SamplerHandle};
pub use buffers::{MemoryBufferPool, WavBufferPool};
pub use config::{SamplerConfig, VelocityLookup};
pub use consolidate::{asset_requests, consolidate, list_assets};
pub use descriptor::{InstrumentDescriptor, RegionNode};
pub use engine::*;
pub use error::{Error, Result};
pub use keymap::KeyVelocityMap;
pub use offline::{OfflineEngine, ScheduledStart};
pub use opcodes::{merge, parse_note_name, Opcodes};
pub use params::*;
pub use sampler::{Notes, Sampler};
pub use types::*;
pub use voices::{Voice, VoiceId, VoiceRegistry};
